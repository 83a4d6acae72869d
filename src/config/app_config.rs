// ==========================================
// 培训中心排课系统 - 进程级配置
// ==========================================
// 来源: 环境变量
// - TRAINING_SCHEDULER_DB_PATH      数据库文件路径
// - TRAINING_SCHEDULER_BIND         HTTP 监听地址 (默认 127.0.0.1:5000)
// - TRAINING_SCHEDULER_DEFAULT_SITE 未携带 X-Site-Id 时的站点 (默认 1)
// - TRAINING_SCHEDULER_LOCALE       界面语言 (默认 en)
// ==========================================

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::repository::error::{RepositoryError, RepositoryResult};

pub const ENV_DB_PATH: &str = "TRAINING_SCHEDULER_DB_PATH";
pub const ENV_BIND: &str = "TRAINING_SCHEDULER_BIND";
pub const ENV_DEFAULT_SITE: &str = "TRAINING_SCHEDULER_DEFAULT_SITE";
pub const ENV_LOCALE: &str = "TRAINING_SCHEDULER_LOCALE";

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_SITE_ID: i64 = 1;
pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: String,
    pub bind_addr: SocketAddr,
    pub default_site_id: i64,
    pub locale: String,
}

impl AppConfig {
    /// 从环境变量加载
    pub fn from_env() -> RepositoryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（便于测试）
    pub fn from_lookup<F>(lookup: F) -> RepositoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = non_empty(ENV_DB_PATH).unwrap_or_else(default_db_path);

        let bind_raw = non_empty(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|_| RepositoryError::FieldValueError {
            field: ENV_BIND.to_string(),
            message: format!("无效的监听地址: {}", bind_raw),
        })?;

        let default_site_id = match non_empty(ENV_DEFAULT_SITE) {
            Some(raw) => raw.parse::<i64>().map_err(|_| RepositoryError::FieldValueError {
                field: ENV_DEFAULT_SITE.to_string(),
                message: format!("无效的站点ID: {}", raw),
            })?,
            None => DEFAULT_SITE_ID,
        };

        let locale = non_empty(ENV_LOCALE).unwrap_or_else(|| DEFAULT_LOCALE.to_string());

        Ok(Self {
            db_path,
            bind_addr,
            default_site_id,
            locale,
        })
    }
}

/// 默认数据库路径（用户数据目录，取不到时回退到当前目录）
pub fn default_db_path() -> String {
    let mut path = PathBuf::from("./training_scheduler.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        let dir = data_dir.join("training-scheduler-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("training-scheduler");

        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("training_scheduler.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_reads_values() {
        let mut env = HashMap::new();
        env.insert(ENV_DB_PATH, "/tmp/ts.db");
        env.insert(ENV_BIND, "0.0.0.0:8080");
        env.insert(ENV_DEFAULT_SITE, "7");
        env.insert(ENV_LOCALE, "zh-CN");

        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.db_path, "/tmp/ts.db");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.default_site_id, 7);
        assert_eq!(config.locale, "zh-CN");
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = AppConfig::from_lookup(|k| {
            if k == ENV_DB_PATH {
                Some("/tmp/x.db".to_string())
            } else {
                Some("   ".to_string())
            }
        })
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND);
        assert_eq!(config.default_site_id, DEFAULT_SITE_ID);
        assert_eq!(config.locale, DEFAULT_LOCALE);
    }

    #[test]
    fn test_from_lookup_rejects_bad_site() {
        let result = AppConfig::from_lookup(|k| match k {
            ENV_DB_PATH => Some("/tmp/x.db".to_string()),
            ENV_DEFAULT_SITE => Some("north".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }
}
