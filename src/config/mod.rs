// ==========================================
// 培训中心排课系统 - 配置层
// ==========================================
// 职责: 三级配置
// - 进程级: AppConfig (环境变量)
// - 站点级: ConfigManager (config_kv 表)
// - 请求级: GenerationConfig (表单，边界校验)
// ==========================================

pub mod app_config;
pub mod config_manager;
pub mod generation_config;

pub use app_config::AppConfig;
pub use config_manager::{config_keys, ConfigManager, ConfigScope, ScheduleDefaults};
pub use generation_config::{ConfigError, ConfigResult, GenerationConfig};
