// ==========================================
// 培训中心排课系统 - API 层
// ==========================================
// 职责: 表单解析、业务 API，供 HTTP 层调用
// ==========================================

pub mod error;
pub mod flash;
pub mod forms;
pub mod schedule_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ConflictDetail};
pub use flash::{generation_messages, FlashCategory, FlashMessage};
pub use forms::FormFields;
pub use schedule_api::{ManualAddReport, ScheduleApi, SlotView};
