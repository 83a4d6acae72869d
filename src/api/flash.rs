// ==========================================
// 培训中心排课系统 - 提示消息
// ==========================================
// 职责: 表单类接口的一次性提示（重定向后由 GET /flash 取出）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::engine::orchestrator::GenerationOutcome;
use crate::engine::slot_packer::StopReason;
use crate::i18n::{t, t_with_args};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: FlashCategory,
    pub message: String,
}

impl FlashMessage {
    pub fn new(category: FlashCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashCategory::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashCategory::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(FlashCategory::Danger, message)
    }
}

/// 排课生成结果 → 提示消息
///
/// 前置条件不满足: 无学员为 warning，无机台为 danger
/// 正常结束: success；有未排单元时追加 warning
pub fn generation_messages(outcome: &GenerationOutcome) -> Vec<FlashMessage> {
    match outcome.stop_reason {
        StopReason::NoSubjects => return vec![FlashMessage::warning(t("schedule.no_students"))],
        StopReason::NoResources => return vec![FlashMessage::danger(t("schedule.no_machines"))],
        _ => {}
    }

    let scheduled = outcome.scheduled_count.to_string();
    let mut messages = vec![FlashMessage::success(t_with_args(
        "schedule.generated",
        &[("count", scheduled.as_str())],
    ))];

    if outcome.unscheduled_units > 0 {
        let key = if outcome.stop_reason == StopReason::NoAllowedWeekday {
            "schedule.no_allowed_weekday"
        } else {
            "schedule.unscheduled"
        };
        let remaining = outcome.unscheduled_units.to_string();
        messages.push(FlashMessage::warning(t_with_args(key, &[("count", remaining.as_str())])));
    }
    messages
}
