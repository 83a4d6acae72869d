// ==========================================
// 培训中心排课系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod directory_repo;
pub mod directory_trait;
pub mod error;
pub mod schedule_repo;
pub mod schedule_store_trait;

// 重导出核心仓储
pub use directory_repo::DirectoryRepository;
pub use directory_trait::Directory;
pub use error::{RepositoryError, RepositoryResult};
pub use schedule_repo::ScheduleEntryRepository;
pub use schedule_store_trait::ScheduleStore;
