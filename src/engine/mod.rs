// ==========================================
// 培训中心排课系统 - 引擎层
// ==========================================
// 职责: 排课规则引擎，不拼 SQL
// 依赖方向: 引擎只依赖 ScheduleStore / Directory trait
// ==========================================
// 组件:
// - TimeWindowCalculator: 工作日/午休/跨日滚动
// - OrderQueue: 排课单元构建与优先级排序
// - SlotPacker: 贪心装箱主循环
// - ConflictChecker: 人工新增/编辑的重叠检查
// - ScheduleGenerator: 一次生成运行的编排
// ==========================================

pub mod conflict;
pub mod error;
pub mod order_queue;
pub mod orchestrator;
pub mod slot_packer;
pub mod time_window;

// 重导出核心引擎
pub use conflict::ConflictChecker;
pub use error::{GenerationError, GenerationResult};
pub use order_queue::OrderQueue;
pub use orchestrator::{
    GenerationOutcome, GenerationRequest, ResolvedSubjects, ScheduleGenerator, SubjectFilter,
};
pub use slot_packer::{EntryTemplate, PackerState, PackingMode, PackingReport, SlotPacker, StopReason};
pub use time_window::{SlotResolution, TimeWindowCalculator};
