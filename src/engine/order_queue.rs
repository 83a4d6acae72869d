// ==========================================
// 培训中心排课系统 - 排课队列
// ==========================================
// 职责: 由学员集合构建排课单元并按优先级规则排序
// 排序: 稳定排序，同键保持插入顺序
// ==========================================

use std::cmp::Ordering;

use crate::domain::directory::Student;
use crate::domain::schedule::SchedulingUnit;
use crate::domain::types::{PriorityRule, SessionKind};

// ==========================================
// OrderQueue
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct OrderQueue {
    units: Vec<SchedulingUnit>,
}

impl OrderQueue {
    /// 每名学员构建一个单元
    ///
    /// # 参数
    /// - students: 已解析的学员（顺序即 FIFO 顺序）
    /// - slot_duration_minutes: 加工时间
    /// - session_kind: 课程类型
    /// - module_label: 模块筛选名称拼接（无模块筛选时为 None）
    pub fn build(
        students: &[Student],
        slot_duration_minutes: u32,
        session_kind: SessionKind,
        module_label: Option<&str>,
    ) -> Self {
        let units = students
            .iter()
            .map(|s| SchedulingUnit {
                subject_id: s.id,
                subject_name: s.student_name.clone(),
                group_name: s.group_name.clone(),
                processing_time_minutes: slot_duration_minutes,
                extra_time_minutes: 0,
                session_kind,
                module_name: module_label.map(str::to_string),
            })
            .collect();
        Self { units }
    }

    pub fn from_units(units: Vec<SchedulingUnit>) -> Self {
        Self { units }
    }

    /// 按优先级规则排序（稳定）
    pub fn ordered(mut self, rule: PriorityRule) -> Self {
        match rule {
            PriorityRule::Fifo => {}
            PriorityRule::Spt => self
                .units
                .sort_by_key(|u| u.processing_time_minutes),
            PriorityRule::Lpt => self
                .units
                .sort_by(|a, b| b.processing_time_minutes.cmp(&a.processing_time_minutes)),
            PriorityRule::Group => self
                .units
                .sort_by(|a, b| missing_last(a.group_name.as_deref(), b.group_name.as_deref())),
            PriorityRule::Module => self
                .units
                .sort_by(|a, b| missing_last(a.module_name.as_deref(), b.module_name.as_deref())),
        }
        self
    }

    pub fn units(&self) -> &[SchedulingUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// 名称升序，空值排最后
fn missing_last(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
