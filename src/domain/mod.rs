// ==========================================
// 培训中心排课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod directory;
pub mod schedule;
pub mod types;

// 重导出核心类型
pub use directory::{Group, Machine, Module, Student};
pub use schedule::{NewScheduleEntry, ScheduleEntry, SchedulingUnit, SlotCandidate, TimeSlot};
pub use types::{GenerationScope, PriorityRule, SessionKind, WeekdaySet};
