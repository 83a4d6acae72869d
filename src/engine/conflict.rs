// ==========================================
// 培训中心排课系统 - 冲突检查
// ==========================================
// 规则: 同站点、同学员姓名、同机台名称，且
//       existing.start < candidate.end AND existing.end > candidate.start
// 范围: 仅人工新增/编辑调用，自动生成不调用
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::domain::schedule::{ScheduleEntry, SlotCandidate};
use crate::repository::error::RepositoryResult;
use crate::repository::schedule_store_trait::ScheduleStore;

pub struct ConflictChecker<S>
where
    S: ScheduleStore + ?Sized,
{
    store: Arc<S>,
}

impl<S> ConflictChecker<S>
where
    S: ScheduleStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 查询与候选时段冲突的条目
    ///
    /// # 参数
    /// - tenant_id: 站点
    /// - candidate: 候选 (学员, 机台, 时段)
    /// - exclude_id: 编辑时排除自身
    pub fn find_conflicts(
        &self,
        tenant_id: i64,
        candidate: &SlotCandidate,
        exclude_id: Option<i64>,
    ) -> RepositoryResult<Vec<ScheduleEntry>> {
        let conflicts: Vec<ScheduleEntry> = self
            .store
            .find_overlapping(
                tenant_id,
                &candidate.subject_name,
                &candidate.resource_name,
                &candidate.slot,
                exclude_id,
            )?
            .into_iter()
            .filter(|e| Some(e.id) != exclude_id && e.slot().overlaps(&candidate.slot))
            .collect();

        if !conflicts.is_empty() {
            debug!(
                tenant_id,
                subject = %candidate.subject_name,
                resource = %candidate.resource_name,
                conflicts = conflicts.len(),
                "检测到时段冲突"
            );
        }
        Ok(conflicts)
    }

    pub fn has_conflict(
        &self,
        tenant_id: i64,
        candidate: &SlotCandidate,
        exclude_id: Option<i64>,
    ) -> RepositoryResult<bool> {
        Ok(!self.find_conflicts(tenant_id, candidate, exclude_id)?.is_empty())
    }
}
