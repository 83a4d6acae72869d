// ==========================================
// 培训中心排课系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储共享同一个 SQLite 连接
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{FlashMessage, ScheduleApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::perf::install_sqlite_tracing;
use crate::repository::directory_repo::DirectoryRepository;
use crate::repository::schedule_repo::ScheduleEntryRepository;

/// 应用状态
///
/// 作为 axum 路由的共享状态（Arc 包装）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 未携带 X-Site-Id 时使用的站点
    pub default_site_id: i64,

    /// 课表API
    pub schedule_api: Arc<ScheduleApi>,

    /// 名录仓储（种子数据/健康检查）
    pub directory_repo: Arc<DirectoryRepository>,

    /// 站点配置
    pub config_manager: Arc<ConfigManager>,

    /// 待取出的提示消息（按站点）
    flashes: Mutex<HashMap<i64, Vec<FlashMessage>>>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - default_site_id: 默认站点
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并安装 SQL 统计
    /// 2. 初始化 schema（幂等）
    /// 3. 创建仓储与API实例
    pub fn new(db_path: String, default_site_id: i64) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        install_sqlite_tracing(&mut conn);
        init_schema(&conn).map_err(|e| format!("初始化schema失败: {}", e))?;

        Ok(Self::from_connection(db_path, Arc::new(Mutex::new(conn)), default_site_id))
    }

    /// 从已有连接创建（schema 需已初始化）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>, default_site_id: i64) -> Self {
        let schedule_repo = Arc::new(ScheduleEntryRepository::from_connection(conn.clone()));
        let directory_repo = Arc::new(DirectoryRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        let schedule_api = Arc::new(ScheduleApi::new(
            schedule_repo,
            directory_repo.clone(),
            config_manager.clone(),
        ));

        tracing::info!(default_site_id, "AppState初始化完成");

        Self {
            db_path,
            default_site_id,
            schedule_api,
            directory_repo,
            config_manager,
            flashes: Mutex::new(HashMap::new()),
        }
    }

    /// 追加提示消息
    pub fn push_flashes<I>(&self, tenant_id: i64, messages: I)
    where
        I: IntoIterator<Item = FlashMessage>,
    {
        let mut flashes = self.flashes.lock().unwrap_or_else(|e| e.into_inner());
        flashes.entry(tenant_id).or_default().extend(messages);
    }

    /// 取出并清空站点的提示消息
    pub fn take_flashes(&self, tenant_id: i64) -> Vec<FlashMessage> {
        let mut flashes = self.flashes.lock().unwrap_or_else(|e| e.into_inner());
        flashes.remove(&tenant_id).unwrap_or_default()
    }
}
