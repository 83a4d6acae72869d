// ==========================================
// 培训中心排课系统 - 课表存储接口
// ==========================================
// 职责: 定义课表条目的读写接口（排课引擎只依赖该 trait）
// 实现: ScheduleEntryRepository (SQLite)
// ==========================================

use chrono::NaiveDate;

use crate::domain::schedule::{NewScheduleEntry, ScheduleEntry, TimeSlot};
use crate::repository::error::RepositoryResult;

/// 课表存储接口
///
/// 所有查询均限定在站点（tenant）范围内。
pub trait ScheduleStore {
    /// 写入单条条目，返回新条目ID
    fn insert(&self, entry: &NewScheduleEntry) -> RepositoryResult<i64>;

    /// 在单个事务内写入多条条目（考试批次使用）
    fn insert_batch(&self, entries: &[NewScheduleEntry]) -> RepositoryResult<usize>;

    /// 原位更新条目（条目不存在时返回 NotFound）
    fn update(&self, entry: &ScheduleEntry) -> RepositoryResult<()>;

    /// 按ID删除，返回是否删除了记录
    fn delete_by_id(&self, tenant_id: i64, id: i64) -> RepositoryResult<bool>;

    /// 清空站点的全部条目，返回删除数量
    fn delete_all(&self, tenant_id: i64) -> RepositoryResult<usize>;

    fn find_by_id(&self, tenant_id: i64, id: i64) -> RepositoryResult<Option<ScheduleEntry>>;

    /// 查询同一 (学员, 机台) 且区间重叠的条目
    ///
    /// 重叠判定: existing.start < slot.end AND existing.end > slot.start
    fn find_overlapping(
        &self,
        tenant_id: i64,
        subject_name: &str,
        resource_name: &str,
        slot: &TimeSlot,
        exclude_id: Option<i64>,
    ) -> RepositoryResult<Vec<ScheduleEntry>>;

    /// 查询与时间范围重叠的条目（按开始时间升序）
    fn find_by_time_range(&self, tenant_id: i64, range: &TimeSlot) -> RepositoryResult<Vec<ScheduleEntry>>;

    /// 查询某日开始的条目（日视图）
    fn find_starting_on(&self, tenant_id: i64, date: NaiveDate) -> RepositoryResult<Vec<ScheduleEntry>>;

    fn find_by_subject(&self, tenant_id: i64, subject_name: &str) -> RepositoryResult<Vec<ScheduleEntry>>;

    fn find_by_resource(&self, tenant_id: i64, resource_name: &str) -> RepositoryResult<Vec<ScheduleEntry>>;

    fn list_all(&self, tenant_id: i64) -> RepositoryResult<Vec<ScheduleEntry>>;

    fn count(&self, tenant_id: i64) -> RepositoryResult<usize>;
}
