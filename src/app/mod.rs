// ==========================================
// 培训中心排课系统 - 应用层
// ==========================================
// 职责: 共享状态 + axum HTTP 路由
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::{router, JsonReply, SharedState};
pub use state::AppState;
