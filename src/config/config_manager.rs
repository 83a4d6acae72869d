// ==========================================
// 培训中心排课系统 - 配置管理器
// ==========================================
// 职责: 站点级排课默认值的加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 优先级: site/<id> > global > 内置默认值
// ==========================================

use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::config::generation_config::{parse_time, parse_u32};
use crate::db::open_sqlite_connection;
use crate::domain::types::WeekdaySet;
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,                 // 全局
    Site { site_id: i64 },  // 站点
}

impl ConfigScope {
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Site { site_id } => format!("site/{}", site_id),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const LUNCH_START: &str = "schedule.lunch_start";
    pub const LUNCH_DURATION_MINUTES: &str = "schedule.lunch_duration_minutes";
    pub const DEFAULT_WEEKDAYS: &str = "schedule.default_weekdays";
    pub const INTER_SLOT_GAP_MINUTES: &str = "schedule.inter_slot_gap_minutes";
}

// ==========================================
// ScheduleDefaults - 站点排课默认值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDefaults {
    pub lunch_start_time: NaiveTime,
    pub lunch_duration_minutes: u32,
    pub allowed_weekdays: WeekdaySet,
    pub inter_slot_gap_minutes: u32,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            lunch_start_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            lunch_duration_minutes: 60,
            allowed_weekdays: WeekdaySet::weekdays(),
            inter_slot_gap_minutes: 0,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取指定作用域的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_value(&self, scope: &ConfigScope, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 按 site → global 顺序解析配置值
    pub fn resolve_value(&self, site_id: i64, key: &str) -> RepositoryResult<Option<String>> {
        if let Some(value) = self.get_value(&ConfigScope::Site { site_id }, key)? {
            return Ok(Some(value));
        }
        self.get_value(&ConfigScope::Global, key)
    }

    /// 写入配置值（UPSERT）
    pub fn set_value(&self, scope: &ConfigScope, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 加载站点排课默认值
    ///
    /// 配置值格式非法时记录告警并使用内置默认值
    pub fn load_schedule_defaults(&self, site_id: i64) -> RepositoryResult<ScheduleDefaults> {
        let mut defaults = ScheduleDefaults::default();

        if let Some(raw) = self.resolve_value(site_id, config_keys::LUNCH_START)? {
            match parse_time(config_keys::LUNCH_START, &raw) {
                Ok(t) => defaults.lunch_start_time = t,
                Err(e) => warn!(site_id, error = %e, "午休开始时间配置非法，使用默认值"),
            }
        }

        if let Some(raw) = self.resolve_value(site_id, config_keys::LUNCH_DURATION_MINUTES)? {
            match parse_u32(config_keys::LUNCH_DURATION_MINUTES, &raw) {
                Ok(v) => defaults.lunch_duration_minutes = v,
                Err(e) => warn!(site_id, error = %e, "午休时长配置非法，使用默认值"),
            }
        }

        if let Some(raw) = self.resolve_value(site_id, config_keys::DEFAULT_WEEKDAYS)? {
            match raw.parse::<WeekdaySet>() {
                Ok(set) if !set.is_empty() => defaults.allowed_weekdays = set,
                Ok(_) => warn!(site_id, "默认工作日配置为空，使用默认值"),
                Err(e) => warn!(site_id, error = %e, "默认工作日配置非法，使用默认值"),
            }
        }

        if let Some(raw) = self.resolve_value(site_id, config_keys::INTER_SLOT_GAP_MINUTES)? {
            match parse_u32(config_keys::INTER_SLOT_GAP_MINUTES, &raw) {
                Ok(v) => defaults.inter_slot_gap_minutes = v,
                Err(e) => warn!(site_id, error = %e, "时段间隔配置非法，使用默认值"),
            }
        }

        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn manager() -> ConfigManager {
        let conn = open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_builtin_defaults_when_empty() {
        let mgr = manager();
        let defaults = mgr.load_schedule_defaults(1).unwrap();
        assert_eq!(defaults, ScheduleDefaults::default());
        assert_eq!(defaults.lunch_start_time, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_site_scope_overrides_global() {
        let mgr = manager();
        mgr.set_value(&ConfigScope::Global, config_keys::LUNCH_DURATION_MINUTES, "45")
            .unwrap();
        mgr.set_value(&ConfigScope::Global, config_keys::LUNCH_START, "12:30")
            .unwrap();
        mgr.set_value(&ConfigScope::Site { site_id: 2 }, config_keys::LUNCH_START, "13:00")
            .unwrap();

        let site1 = mgr.load_schedule_defaults(1).unwrap();
        assert_eq!(site1.lunch_start_time, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert_eq!(site1.lunch_duration_minutes, 45);

        let site2 = mgr.load_schedule_defaults(2).unwrap();
        assert_eq!(site2.lunch_start_time, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        assert_eq!(site2.lunch_duration_minutes, 45);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let mgr = manager();
        mgr.set_value(&ConfigScope::Global, config_keys::DEFAULT_WEEKDAYS, "0,9")
            .unwrap();
        mgr.set_value(&ConfigScope::Global, config_keys::INTER_SLOT_GAP_MINUTES, "abc")
            .unwrap();

        let defaults = mgr.load_schedule_defaults(1).unwrap();
        assert_eq!(defaults.allowed_weekdays, WeekdaySet::weekdays());
        assert_eq!(defaults.inter_slot_gap_minutes, 0);
    }

    #[test]
    fn test_set_value_upserts() {
        let mgr = manager();
        let scope = ConfigScope::Site { site_id: 3 };
        mgr.set_value(&scope, config_keys::DEFAULT_WEEKDAYS, "0,1").unwrap();
        mgr.set_value(&scope, config_keys::DEFAULT_WEEKDAYS, "5,6").unwrap();
        assert_eq!(
            mgr.get_value(&scope, config_keys::DEFAULT_WEEKDAYS).unwrap(),
            Some("5,6".to_string())
        );
    }
}
