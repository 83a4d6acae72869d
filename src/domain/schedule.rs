// ==========================================
// 培训中心排课系统 - 课表领域模型
// ==========================================
// 职责: 课表条目、排课单元、时段
// 不变式: start_time < end_time (严格)
// 不变式: 同一机台/同一学员的条目区间不重叠
//         (仅人工新增/编辑时强制校验，自动生成不校验)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::SessionKind;

// ==========================================
// TimeSlot - 半开区间 [start, end)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// 半开区间重叠判定（端点相接不算重叠）
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

// ==========================================
// ScheduleEntry - 课表条目（已持久化）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,                           // 条目ID
    pub tenant_id: i64,                    // 所属站点
    pub subject_id: Option<i64>,           // 学员ID (名录可解析时填写)
    pub subject_name: String,              // 学员姓名
    pub resource_name: String,             // 机台名称
    pub group_name: Option<String>,        // 班组名称
    pub module_name: Option<String>,       // 模块名称
    pub start_time: NaiveDateTime,         // 开始时间
    pub end_time: NaiveDateTime,           // 结束时间
    pub extra_time_minutes: i32,           // 额外时间(分钟)
    pub session_kind: SessionKind,         // 课程类型
    pub capacity: i32,                     // 时段容量 (考试批次 > 1)
    pub notes: Option<String>,             // 备注
    pub generation_run_id: Option<String>, // 生成批次ID (人工条目为空)
}

impl ScheduleEntry {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }
}

// ==========================================
// NewScheduleEntry - 待写入条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduleEntry {
    pub tenant_id: i64,
    pub subject_id: Option<i64>,
    pub subject_name: String,
    pub resource_name: String,
    pub group_name: Option<String>,
    pub module_name: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub extra_time_minutes: i32,
    pub session_kind: SessionKind,
    pub capacity: i32,
    pub notes: Option<String>,
    pub generation_run_id: Option<String>,
}

impl NewScheduleEntry {
    /// 人工排课条目（实操课，容量 1）
    pub fn manual(
        tenant_id: i64,
        subject_id: Option<i64>,
        subject_name: &str,
        resource_name: &str,
        group_name: Option<String>,
        slot: TimeSlot,
    ) -> Self {
        Self {
            tenant_id,
            subject_id,
            subject_name: subject_name.to_string(),
            resource_name: resource_name.to_string(),
            group_name,
            module_name: None,
            start_time: slot.start,
            end_time: slot.end,
            extra_time_minutes: 0,
            session_kind: SessionKind::Practical,
            capacity: 1,
            notes: None,
            generation_run_id: None,
        }
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }
}

// ==========================================
// SlotCandidate - 冲突检查候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCandidate {
    pub subject_name: String,
    pub resource_name: String,
    pub slot: TimeSlot,
}

impl SlotCandidate {
    pub fn new(subject_name: &str, resource_name: &str, slot: TimeSlot) -> Self {
        Self {
            subject_name: subject_name.to_string(),
            resource_name: resource_name.to_string(),
            slot,
        }
    }
}

// ==========================================
// SchedulingUnit - 排课单元（单次生成内的临时对象）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingUnit {
    pub subject_id: i64,               // 学员ID (稳定标识)
    pub subject_name: String,          // 学员姓名 (写入条目的快照)
    pub group_name: Option<String>,    // 班组名称
    pub processing_time_minutes: u32,  // 加工时间(分钟) > 0
    pub extra_time_minutes: u32,       // 额外时间(分钟)
    pub session_kind: SessionKind,     // 课程类型
    pub module_name: Option<String>,   // 模块名称
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_time_slot_half_open_overlap() {
        let a = TimeSlot::new(at(9, 0), at(10, 0));
        let b = TimeSlot::new(at(9, 30), at(10, 30));
        let c = TimeSlot::new(at(10, 0), at(11, 0));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // 端点相接不算重叠
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
        assert_eq!(a.duration_minutes(), 60);
    }
}
