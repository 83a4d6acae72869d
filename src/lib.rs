// ==========================================
// 培训中心排课系统 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 机台实操课/考试的自动排课与人工调整
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排课规则
pub mod engine;

// 配置层 - 进程/站点/请求配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// SQL 统计
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{GenerationScope, PriorityRule, SessionKind, WeekdaySet};

// 领域实体
pub use domain::{Machine, NewScheduleEntry, ScheduleEntry, SchedulingUnit, Student, TimeSlot};

// 引擎
pub use engine::{
    ConflictChecker, GenerationOutcome, OrderQueue, ScheduleGenerator, SlotPacker, TimeWindowCalculator,
};

// API
pub use api::{ApiError, ScheduleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "培训中心排课系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
