// ==========================================
// 培训中心排课系统 - 时段装箱引擎
// ==========================================
// 职责: 贪心排课主循环
// 输入: 已排序的排课单元 + 机台列表 + 时间窗口
// 输出: 写入 ScheduleStore 的条目 + PackingReport
// ==========================================
// 主循环:
// 1) current >= horizon → 停止
// 2) 滚动到工作日，无工作日 → 停止
// 3) 解析时段，顺延时用同一单元/批次重试
// 4) 机台 = machines[resource_index % len]，写入条目
// 5) current = slot.end + gap，推进机台游标
// ==========================================

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::generation_config::GenerationConfig;
use crate::domain::directory::Machine;
use crate::domain::schedule::{NewScheduleEntry, SchedulingUnit, TimeSlot};
use crate::domain::types::SessionKind;
use crate::engine::error::{GenerationError, GenerationResult};
use crate::engine::time_window::{SlotResolution, TimeWindowCalculator};
use crate::repository::schedule_store_trait::ScheduleStore;

// ==========================================
// PackingMode - 装箱模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingMode {
    /// 每名学员一个时段，容量 1，每个单元后轮转机台
    Individual,
    /// 考试批次: 一批学员共享时段与机台
    Batch { capacity: u32, same_resource: bool },
}

impl PackingMode {
    pub fn from_config(config: &GenerationConfig) -> Self {
        if config.is_batch_mode() {
            PackingMode::Batch {
                capacity: config.sessions_per_batch,
                same_resource: config.same_resource_for_batch,
            }
        } else {
            PackingMode::Individual
        }
    }

    fn group_size(&self) -> usize {
        match self {
            PackingMode::Individual => 1,
            PackingMode::Batch { capacity, .. } => (*capacity).max(1) as usize,
        }
    }

    fn slot_capacity(&self) -> i32 {
        match self {
            PackingMode::Individual => 1,
            PackingMode::Batch { capacity, .. } => i32::try_from((*capacity).max(1)).unwrap_or(i32::MAX),
        }
    }

    fn advances_resource(&self) -> bool {
        match self {
            PackingMode::Individual => true,
            PackingMode::Batch { same_resource, .. } => !same_resource,
        }
    }
}

// ==========================================
// StopReason - 运行终止原因
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,        // 全部单元已排
    HorizonReached,   // 到达排课终点仍有剩余
    NoAllowedWeekday, // 日期范围内没有允许的工作日
    NoSubjects,       // 没有符合条件的学员
    NoResources,      // 没有可用机台
}

impl StopReason {
    /// 前置条件不满足（运行未开始，未清空、未写入）
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, StopReason::NoSubjects | StopReason::NoResources)
    }
}

// ==========================================
// PackerState - 装箱状态（显式贯穿主循环）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackerState {
    pub current: NaiveDateTime,
    pub resource_index: usize,
    pub scheduled_count: usize, // 已写入条目数
    pub placements: usize,      // 已放置时段数
}

impl PackerState {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: start,
            resource_index: 0,
            scheduled_count: 0,
            placements: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackingReport {
    pub state: PackerState,
    pub unscheduled_units: usize,
    pub stop_reason: StopReason,
}

// ==========================================
// EntryTemplate - 条目公共字段
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTemplate {
    pub tenant_id: i64,
    pub session_kind: SessionKind,
    pub notes: Option<String>,
    pub generation_run_id: Option<String>,
}

// ==========================================
// SlotPacker
// ==========================================
pub struct SlotPacker {
    windows: TimeWindowCalculator,
    mode: PackingMode,
    inter_slot_gap: Duration,
    template: EntryTemplate,
}

impl SlotPacker {
    pub fn new(
        windows: TimeWindowCalculator,
        mode: PackingMode,
        inter_slot_gap_minutes: u32,
        template: EntryTemplate,
    ) -> Self {
        Self {
            windows,
            mode,
            inter_slot_gap: Duration::minutes(i64::from(inter_slot_gap_minutes)),
            template,
        }
    }

    pub fn mode(&self) -> PackingMode {
        self.mode
    }

    /// 执行装箱
    ///
    /// # 参数
    /// - store: 课表存储（逐单元 / 逐批次提交）
    /// - units: 已排序的排课单元
    /// - resources: 机台列表（轮转顺序）
    /// - start: 起始时刻
    ///
    /// # 返回
    /// - Ok(PackingReport)
    /// - Err(StoreWriteFailed): 写入失败，之前写入的条目保留
    #[instrument(skip(self, store, units, resources), fields(
        tenant_id = self.template.tenant_id,
        units_count = units.len(),
        resources_count = resources.len(),
        mode = ?self.mode
    ))]
    pub fn pack<S>(
        &self,
        store: &S,
        units: &[SchedulingUnit],
        resources: &[Machine],
        start: NaiveDateTime,
    ) -> GenerationResult<PackingReport>
    where
        S: ScheduleStore + ?Sized,
    {
        let mut state = PackerState::new(start);

        if units.is_empty() {
            return Ok(PackingReport {
                state,
                unscheduled_units: 0,
                stop_reason: StopReason::NoSubjects,
            });
        }
        if resources.is_empty() {
            return Ok(PackingReport {
                state,
                unscheduled_units: units.len(),
                stop_reason: StopReason::NoResources,
            });
        }
        if !self.windows.has_working_day_before_horizon(start.date()) {
            return Ok(PackingReport {
                state,
                unscheduled_units: units.len(),
                stop_reason: StopReason::NoAllowedWeekday,
            });
        }

        let groups: Vec<&[SchedulingUnit]> = units.chunks(self.mode.group_size()).collect();
        let mut placed_units = 0usize;
        let mut next_group = 0usize;
        let mut stop_reason = StopReason::Completed;

        while next_group < groups.len() {
            if state.current >= self.windows.horizon() {
                stop_reason = StopReason::HorizonReached;
                break;
            }

            state.current = match self.windows.advance_to_next_working_instant(state.current) {
                Some(t) => t,
                None => {
                    stop_reason = StopReason::HorizonReached;
                    break;
                }
            };

            let group = groups[next_group];
            let duration = group
                .iter()
                .map(|u| u.processing_time_minutes)
                .max()
                .unwrap_or(0);

            let slot = match self.windows.resolve_slot(state.current, duration) {
                SlotResolution::Placed(slot) => slot,
                SlotResolution::Rollover { next_day_start } => {
                    debug!(current = %state.current, %next_day_start, "当日放不下，顺延到下一日");
                    state.current = next_day_start;
                    continue;
                }
            };

            let resource = &resources[state.resource_index % resources.len()];
            let entries: Vec<NewScheduleEntry> = group
                .iter()
                .map(|unit| self.entry_for(unit, resource, slot))
                .collect();

            let write = match self.mode {
                PackingMode::Individual => store.insert(&entries[0]).map(|_| 1),
                PackingMode::Batch { .. } => store.insert_batch(&entries),
            };
            let written = write.map_err(|source| GenerationError::StoreWriteFailed {
                written_before_failure: state.scheduled_count,
                source,
            })?;

            state.scheduled_count += written;
            state.placements += 1;
            placed_units += group.len();
            state.current = slot.end + self.inter_slot_gap;
            if self.mode.advances_resource() {
                state.resource_index += 1;
            }
            next_group += 1;
        }

        let unscheduled_units = units.len() - placed_units;
        info!(
            scheduled_count = state.scheduled_count,
            placements = state.placements,
            unscheduled_units,
            stop_reason = ?stop_reason,
            "装箱完成"
        );

        Ok(PackingReport {
            state,
            unscheduled_units,
            stop_reason,
        })
    }

    fn entry_for(&self, unit: &SchedulingUnit, resource: &Machine, slot: TimeSlot) -> NewScheduleEntry {
        NewScheduleEntry {
            tenant_id: self.template.tenant_id,
            subject_id: Some(unit.subject_id),
            subject_name: unit.subject_name.clone(),
            resource_name: resource.machine_name.clone(),
            group_name: unit.group_name.clone(),
            module_name: unit.module_name.clone(),
            start_time: slot.start,
            end_time: slot.end,
            extra_time_minutes: i32::try_from(unit.extra_time_minutes).unwrap_or(i32::MAX),
            session_kind: self.template.session_kind,
            capacity: self.mode.slot_capacity(),
            notes: self.template.notes.clone(),
            generation_run_id: self.template.generation_run_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::schedule::ScheduleEntry;
    use crate::domain::types::WeekdaySet;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use crate::repository::ScheduleEntryRepository;
    use chrono::{NaiveDate, NaiveTime};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TENANT: i64 = 1;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        // 2024-03-04 为周一
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn store() -> ScheduleEntryRepository {
        ScheduleEntryRepository::from_connection(Arc::new(Mutex::new(open_in_memory().unwrap())))
    }

    fn machines(n: usize) -> Vec<Machine> {
        (1..=n)
            .map(|i| Machine {
                id: i as i64,
                tenant_id: TENANT,
                machine_name: format!("Lathe {}", i),
                level: "Level 1".to_string(),
            })
            .collect()
    }

    fn units(n: usize, minutes: u32) -> Vec<SchedulingUnit> {
        (1..=n)
            .map(|i| SchedulingUnit {
                subject_id: i as i64,
                subject_name: format!("Student {}", i),
                group_name: None,
                processing_time_minutes: minutes,
                extra_time_minutes: 0,
                session_kind: SessionKind::Practical,
                module_name: None,
            })
            .collect()
    }

    fn config(first: NaiveDate, last: NaiveDate, daily_end: NaiveTime) -> GenerationConfig {
        let mut config = GenerationConfig::new(first, last);
        config.daily_end_time = daily_end;
        config.allowed_weekdays = WeekdaySet::all_days();
        config
    }

    #[test]
    fn test_entry_fields_saturate_at_i32() {
        let mut config = config(date(4), date(4), t(17, 0));
        config.session_kind = SessionKind::WrittenTest;
        config.sessions_per_batch = u32::MAX;
        let packer = packer(&config);

        let mut unit = units(1, 60).remove(0);
        unit.extra_time_minutes = u32::MAX;
        let slot = TimeSlot::new(date(4).and_time(t(8, 0)), date(4).and_time(t(9, 0)));

        let entry = packer.entry_for(&unit, &machines(1)[0], slot);
        assert_eq!(entry.extra_time_minutes, i32::MAX);
        assert_eq!(entry.capacity, i32::MAX);
    }

    fn packer(config: &GenerationConfig) -> SlotPacker {
        SlotPacker::new(
            TimeWindowCalculator::from_config(config),
            PackingMode::from_config(config),
            config.inter_slot_gap_minutes,
            EntryTemplate {
                tenant_id: TENANT,
                session_kind: config.session_kind,
                notes: config.notes.clone(),
                generation_run_id: Some("run-1".to_string()),
            },
        )
    }

    fn slots(entries: &[ScheduleEntry]) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        entries.iter().map(|e| (e.start_time, e.end_time)).collect()
    }

    #[test]
    fn test_morning_window_three_subjects_one_resource() {
        let config = config(date(4), date(4), t(12, 0));
        let store = store();

        let report = packer(&config)
            .pack(&store, &units(3, 60), &machines(1), config.start_instant())
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Completed);
        assert_eq!(report.state.scheduled_count, 3);
        let entries = store.list_all(TENANT).unwrap();
        assert_eq!(
            slots(&entries),
            vec![
                (date(4).and_time(t(8, 0)), date(4).and_time(t(9, 0))),
                (date(4).and_time(t(9, 0)), date(4).and_time(t(10, 0))),
                (date(4).and_time(t(10, 0)), date(4).and_time(t(11, 0))),
            ]
        );
        assert!(entries.iter().all(|e| e.generation_run_id.as_deref() == Some("run-1")));
    }

    #[test]
    fn test_generated_entries_avoid_lunch_and_day_end() {
        let config = config(date(4), date(6), t(17, 0));
        let store = store();

        packer(&config)
            .pack(&store, &units(20, 50), &machines(2), config.start_instant())
            .unwrap();

        for entry in store.list_all(TENANT).unwrap() {
            let day = entry.start_time.date();
            let lunch = TimeSlot::new(day.and_time(t(12, 0)), day.and_time(t(13, 0)));
            assert!(!entry.slot().overlaps(&lunch), "{:?} overlaps lunch", entry.slot());
            assert!(entry.end_time <= day.and_time(t(17, 0)));
        }
    }

    #[test]
    fn test_round_robin_is_fair() {
        let config = config(date(4), date(8), t(17, 0));
        let store = store();

        packer(&config)
            .pack(&store, &units(7, 30), &machines(3), config.start_instant())
            .unwrap();

        let mut per_machine: HashMap<String, usize> = HashMap::new();
        for entry in store.list_all(TENANT).unwrap() {
            *per_machine.entry(entry.resource_name).or_default() += 1;
        }
        assert_eq!(per_machine.len(), 3);
        assert!(per_machine.values().all(|&n| n == 2 || n == 3));
    }

    #[test]
    fn test_rollover_retries_unit_on_next_allowed_day() {
        // 周五开始，只允许工作日
        let mut config = config(date(8), date(11), t(17, 0));
        config.allowed_weekdays = WeekdaySet::weekdays();
        let store = store();

        let report = packer(&config)
            .pack(&store, &units(3, 240), &machines(1), config.start_instant())
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Completed);
        let entries = store.list_all(TENANT).unwrap();
        assert_eq!(
            slots(&entries),
            vec![
                (date(8).and_time(t(8, 0)), date(8).and_time(t(12, 0))),
                (date(8).and_time(t(13, 0)), date(8).and_time(t(17, 0))),
                (date(11).and_time(t(8, 0)), date(11).and_time(t(12, 0))),
            ]
        );
    }

    #[test]
    fn test_horizon_leaves_units_unscheduled() {
        let config = config(date(4), date(4), t(10, 0));
        let store = store();

        let report = packer(&config)
            .pack(&store, &units(3, 60), &machines(1), config.start_instant())
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::HorizonReached);
        assert_eq!(report.state.scheduled_count, 2);
        assert_eq!(report.unscheduled_units, 1);
    }

    #[test]
    fn test_no_allowed_weekday_in_range() {
        // 周六至周日，只允许工作日
        let mut config = config(date(9), date(10), t(17, 0));
        config.allowed_weekdays = WeekdaySet::weekdays();
        let store = store();

        let report = packer(&config)
            .pack(&store, &units(2, 60), &machines(1), config.start_instant())
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::NoAllowedWeekday);
        assert_eq!(store.count(TENANT).unwrap(), 0);
    }

    #[test]
    fn test_batch_mode_shares_slot_and_rotates_resource() {
        let mut config = config(date(4), date(4), t(17, 0));
        config.session_kind = SessionKind::WrittenTest;
        config.sessions_per_batch = 2;
        let store = store();

        let report = packer(&config)
            .pack(&store, &units(5, 60), &machines(2), config.start_instant())
            .unwrap();

        assert_eq!(report.state.placements, 3);
        assert_eq!(report.state.scheduled_count, 5);

        let entries = store.list_all(TENANT).unwrap();
        assert!(entries.iter().all(|e| e.capacity == 2 && e.session_kind == SessionKind::WrittenTest));
        assert_eq!(entries[0].slot(), entries[1].slot());
        assert_eq!(entries[0].resource_name, entries[1].resource_name);
        assert_eq!(entries[0].resource_name, "Lathe 1");
        assert_eq!(entries[2].resource_name, "Lathe 2");
        assert_eq!(entries[4].resource_name, "Lathe 1");
        assert_eq!(entries[4].start_time, date(4).and_time(t(10, 0)));
    }

    #[test]
    fn test_batch_mode_same_resource() {
        let mut config = config(date(4), date(4), t(17, 0));
        config.session_kind = SessionKind::PracticalTest;
        config.sessions_per_batch = 3;
        config.same_resource_for_batch = true;
        let store = store();

        packer(&config)
            .pack(&store, &units(7, 60), &machines(3), config.start_instant())
            .unwrap();

        let entries = store.list_all(TENANT).unwrap();
        assert_eq!(entries.len(), 7);
        assert!(entries.iter().all(|e| e.resource_name == "Lathe 1"));
    }

    #[test]
    fn test_inter_slot_gap_applied() {
        let mut config = config(date(4), date(4), t(12, 0));
        config.inter_slot_gap_minutes = 15;
        let store = store();

        packer(&config)
            .pack(&store, &units(2, 60), &machines(1), config.start_instant())
            .unwrap();

        let entries = store.list_all(TENANT).unwrap();
        assert_eq!(entries[1].start_time, date(4).and_time(t(9, 15)));
    }

    #[test]
    fn test_empty_resources_writes_nothing() {
        let config = config(date(4), date(4), t(17, 0));
        let store = store();

        let report = packer(&config)
            .pack(&store, &units(2, 60), &[], config.start_instant())
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::NoResources);
        assert_eq!(report.unscheduled_units, 2);
        assert_eq!(store.count(TENANT).unwrap(), 0);
    }

    /// 写入 N 条后失败的存储
    struct FailingStore {
        inner: ScheduleEntryRepository,
        remaining: Cell<usize>,
    }

    impl ScheduleStore for FailingStore {
        fn insert(&self, entry: &NewScheduleEntry) -> RepositoryResult<i64> {
            if self.remaining.get() == 0 {
                return Err(RepositoryError::DatabaseQueryError("disk full".to_string()));
            }
            self.remaining.set(self.remaining.get() - 1);
            self.inner.insert(entry)
        }
        fn insert_batch(&self, entries: &[NewScheduleEntry]) -> RepositoryResult<usize> {
            self.inner.insert_batch(entries)
        }
        fn update(&self, entry: &ScheduleEntry) -> RepositoryResult<()> {
            self.inner.update(entry)
        }
        fn delete_by_id(&self, tenant_id: i64, id: i64) -> RepositoryResult<bool> {
            self.inner.delete_by_id(tenant_id, id)
        }
        fn delete_all(&self, tenant_id: i64) -> RepositoryResult<usize> {
            self.inner.delete_all(tenant_id)
        }
        fn find_by_id(&self, tenant_id: i64, id: i64) -> RepositoryResult<Option<ScheduleEntry>> {
            self.inner.find_by_id(tenant_id, id)
        }
        fn find_overlapping(
            &self,
            tenant_id: i64,
            subject_name: &str,
            resource_name: &str,
            slot: &TimeSlot,
            exclude_id: Option<i64>,
        ) -> RepositoryResult<Vec<ScheduleEntry>> {
            self.inner
                .find_overlapping(tenant_id, subject_name, resource_name, slot, exclude_id)
        }
        fn find_by_time_range(&self, tenant_id: i64, range: &TimeSlot) -> RepositoryResult<Vec<ScheduleEntry>> {
            self.inner.find_by_time_range(tenant_id, range)
        }
        fn find_starting_on(&self, tenant_id: i64, date: NaiveDate) -> RepositoryResult<Vec<ScheduleEntry>> {
            self.inner.find_starting_on(tenant_id, date)
        }
        fn find_by_subject(&self, tenant_id: i64, subject_name: &str) -> RepositoryResult<Vec<ScheduleEntry>> {
            self.inner.find_by_subject(tenant_id, subject_name)
        }
        fn find_by_resource(&self, tenant_id: i64, resource_name: &str) -> RepositoryResult<Vec<ScheduleEntry>> {
            self.inner.find_by_resource(tenant_id, resource_name)
        }
        fn list_all(&self, tenant_id: i64) -> RepositoryResult<Vec<ScheduleEntry>> {
            self.inner.list_all(tenant_id)
        }
        fn count(&self, tenant_id: i64) -> RepositoryResult<usize> {
            self.inner.count(tenant_id)
        }
    }

    #[test]
    fn test_store_failure_keeps_earlier_entries() {
        let config = config(date(4), date(4), t(17, 0));
        let store = FailingStore {
            inner: store(),
            remaining: Cell::new(2),
        };

        let err = packer(&config)
            .pack(&store, &units(4, 60), &machines(1), config.start_instant())
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::StoreWriteFailed {
                written_before_failure: 2,
                ..
            }
        ));
        assert_eq!(store.inner.count(TENANT).unwrap(), 2);
    }
}
