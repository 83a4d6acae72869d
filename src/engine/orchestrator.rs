// ==========================================
// 培训中心排课系统 - 排课生成编排器
// ==========================================
// 用途: 协调一次排课生成运行
// 流程:
// 1) 校验配置
// 2) 解析学员集合 (SubjectFilter) 与机台集合
// 3) 前置条件不满足 → 0 条，不写入、不清空
// 4) 按清空策略清空站点课表
// 5) OrderQueue 排序 → SlotPacker 装箱
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::generation_config::GenerationConfig;
use crate::domain::directory::{Machine, Student};
use crate::domain::types::{GenerationScope, SessionKind, WeekdaySet};
use crate::engine::error::{GenerationError, GenerationResult};
use crate::engine::order_queue::OrderQueue;
use crate::engine::slot_packer::{EntryTemplate, PackingMode, SlotPacker, StopReason};
use crate::engine::time_window::TimeWindowCalculator;
use crate::repository::directory_trait::Directory;
use crate::repository::schedule_store_trait::ScheduleStore;

// ==========================================
// SubjectFilter - 学员筛选
// ==========================================
// student_ids 非空时覆盖其他条件；
// 否则 group_ids 与 module_ids 取并集；都为空时取全部学员
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFilter {
    pub student_ids: Vec<i64>,
    pub group_ids: Vec<i64>,
    pub module_ids: Vec<i64>,
}

impl SubjectFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.student_ids.is_empty() && self.group_ids.is_empty() && self.module_ids.is_empty()
    }
}

/// 解析后的学员集合
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSubjects {
    pub students: Vec<Student>,       // 按学员ID升序，去重
    pub module_label: Option<String>, // 模块筛选名称，逗号拼接
}

// ==========================================
// GenerationRequest / GenerationOutcome
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub tenant_id: i64,
    pub config: GenerationConfig,
    pub filter: SubjectFilter,
    pub machine_ids: Vec<i64>, // 为空表示全部机台
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub run_id: String,
    pub unit_count: usize,
    pub scheduled_count: usize,   // 写入条目数
    pub placements_count: usize,  // 放置时段数
    pub unscheduled_units: usize,
    pub cleared_count: usize,
    pub stop_reason: StopReason,
}

impl GenerationOutcome {
    fn precondition_failed(run_id: String, unit_count: usize, stop_reason: StopReason) -> Self {
        Self {
            run_id,
            unit_count,
            scheduled_count: 0,
            placements_count: 0,
            unscheduled_units: unit_count,
            cleared_count: 0,
            stop_reason,
        }
    }
}

// ==========================================
// ScheduleGenerator - 生成编排器
// ==========================================
pub struct ScheduleGenerator<S, D>
where
    S: ScheduleStore + ?Sized,
    D: Directory + ?Sized,
{
    store: Arc<S>,
    directory: Arc<D>,
}

impl<S, D> ScheduleGenerator<S, D>
where
    S: ScheduleStore + ?Sized,
    D: Directory + ?Sized,
{
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - store: 课表存储
    /// - directory: 名录
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }

    /// 基础生成
    ///
    /// 全部学员、单人模式、一周七天、运行前无条件清空站点课表
    #[instrument(skip(self, config), fields(
        start_date = %config.start_date,
        end_date = %config.end_date,
        priority_rule = %config.priority_rule
    ))]
    pub fn generate_basic(&self, tenant_id: i64, config: &GenerationConfig) -> GenerationResult<GenerationOutcome> {
        let mut config = config.clone();
        config.session_kind = SessionKind::Practical;
        config.sessions_per_batch = 1;
        config.scope = GenerationScope::All;
        config.clear_existing = true;
        config.allowed_weekdays = WeekdaySet::all_days();

        let request = GenerationRequest {
            tenant_id,
            config,
            filter: SubjectFilter::all(),
            machine_ids: Vec::new(),
        };
        self.run(&request)
    }

    /// 高级生成
    #[instrument(skip(self, request), fields(
        tenant_id = request.tenant_id,
        scope = %request.config.scope,
        session_kind = %request.config.session_kind,
        clear_existing = request.config.clear_existing
    ))]
    pub fn generate_advanced(&self, request: &GenerationRequest) -> GenerationResult<GenerationOutcome> {
        self.run(request)
    }

    fn run(&self, request: &GenerationRequest) -> GenerationResult<GenerationOutcome> {
        let config = &request.config;
        let tenant_id = request.tenant_id;
        config.validate()?;

        let run_id = Uuid::new_v4().to_string();

        // 1. 学员集合
        let subjects = self.resolve_subjects(tenant_id, &request.filter)?;
        if subjects.students.is_empty() {
            warn!(tenant_id, "没有符合条件的学员，跳过生成");
            return Ok(GenerationOutcome::precondition_failed(run_id, 0, StopReason::NoSubjects));
        }

        // 2. 机台集合
        let resources = self.resolve_resources(tenant_id, &request.machine_ids)?;
        if resources.is_empty() {
            warn!(tenant_id, "没有可用机台，跳过生成");
            return Ok(GenerationOutcome::precondition_failed(
                run_id,
                subjects.students.len(),
                StopReason::NoResources,
            ));
        }

        // 3. 清空策略
        let cleared_count = if config.clear_existing {
            self.store
                .delete_all(tenant_id)
                .map_err(GenerationError::ClearFailed)?
        } else {
            0
        };

        // 4. 排序
        let queue = OrderQueue::build(
            &subjects.students,
            config.slot_duration_minutes,
            config.session_kind,
            subjects.module_label.as_deref(),
        )
        .ordered(config.priority_rule);

        // 5. 装箱
        let packer = SlotPacker::new(
            TimeWindowCalculator::from_config(config),
            PackingMode::from_config(config),
            config.inter_slot_gap_minutes,
            EntryTemplate {
                tenant_id,
                session_kind: config.session_kind,
                notes: config.notes.clone().filter(|n| !n.trim().is_empty()),
                generation_run_id: Some(run_id.clone()),
            },
        );
        let report = packer.pack(self.store.as_ref(), queue.units(), &resources, config.start_instant())?;

        let outcome = GenerationOutcome {
            run_id,
            unit_count: queue.len(),
            scheduled_count: report.state.scheduled_count,
            placements_count: report.state.placements,
            unscheduled_units: report.unscheduled_units,
            cleared_count,
            stop_reason: report.stop_reason,
        };

        info!(
            tenant_id,
            run_id = %outcome.run_id,
            unit_count = outcome.unit_count,
            scheduled_count = outcome.scheduled_count,
            cleared_count = outcome.cleared_count,
            stop_reason = ?outcome.stop_reason,
            "排课生成完成"
        );
        Ok(outcome)
    }

    /// 解析学员集合
    pub fn resolve_subjects(&self, tenant_id: i64, filter: &SubjectFilter) -> GenerationResult<ResolvedSubjects> {
        if !filter.student_ids.is_empty() {
            let students = self
                .directory
                .find_students_by_ids(tenant_id, &filter.student_ids)
                .map_err(GenerationError::DirectoryReadFailed)?;
            return Ok(ResolvedSubjects {
                students: dedup_by_id(students),
                module_label: None,
            });
        }

        if filter.is_unrestricted() {
            let students = self.directory.list_students(tenant_id).map_err(GenerationError::DirectoryReadFailed)?;
            return Ok(ResolvedSubjects {
                students: dedup_by_id(students),
                module_label: None,
            });
        }

        let mut students = self
            .directory
            .find_students_by_group_ids(tenant_id, &filter.group_ids)
            .map_err(GenerationError::DirectoryReadFailed)?;

        let mut module_label = None;
        if !filter.module_ids.is_empty() {
            let modules = self
                .directory
                .find_modules_by_ids(tenant_id, &filter.module_ids)
                .map_err(GenerationError::DirectoryReadFailed)?;
            if !modules.is_empty() {
                let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
                module_label = Some(names.join(", "));
            }
            students.extend(
                self.directory
                    .find_students_by_module_ids(tenant_id, &filter.module_ids)
                    .map_err(GenerationError::DirectoryReadFailed)?,
            );
        }

        Ok(ResolvedSubjects {
            students: dedup_by_id(students),
            module_label,
        })
    }

    /// 解析机台集合（为空表示全部机台）
    pub fn resolve_resources(&self, tenant_id: i64, machine_ids: &[i64]) -> GenerationResult<Vec<Machine>> {
        let machines = if machine_ids.is_empty() {
            self.directory.list_machines(tenant_id)
        } else {
            self.directory.find_machines_by_ids(tenant_id, machine_ids)
        };
        machines.map_err(GenerationError::DirectoryReadFailed)
    }
}

/// 按学员ID升序去重
fn dedup_by_id(students: Vec<Student>) -> Vec<Student> {
    let by_id: BTreeMap<i64, Student> = students.into_iter().map(|s| (s.id, s)).collect();
    by_id.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::types::PriorityRule;
    use crate::repository::{DirectoryRepository, ScheduleEntryRepository};
    use chrono::{NaiveDate, NaiveTime};
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct Fixture {
        store: Arc<ScheduleEntryRepository>,
        directory: Arc<DirectoryRepository>,
        generator: ScheduleGenerator<ScheduleEntryRepository, DirectoryRepository>,
        site: i64,
    }

    fn fixture() -> Fixture {
        let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let store = Arc::new(ScheduleEntryRepository::from_connection(conn.clone()));
        let directory = Arc::new(DirectoryRepository::from_connection(conn));
        let generator = ScheduleGenerator::new(store.clone(), directory.clone());
        let site = directory.insert_site("North Campus").unwrap();
        Fixture {
            store,
            directory,
            generator,
            site,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn test_subject_filter_union_and_override() {
        let f = fixture();
        let welding = f.directory.insert_group(f.site, "Welding").unwrap();
        let rigging = f.directory.insert_group(f.site, "Rigging").unwrap();
        let amy = f.directory.insert_student(f.site, None, "Amy", Some(welding)).unwrap();
        let ben = f.directory.insert_student(f.site, None, "Ben", Some(rigging)).unwrap();
        let cid = f.directory.insert_student(f.site, None, "Cid", None).unwrap();
        let safety = f.directory.insert_module(f.site, "Safety", None).unwrap();
        f.directory.enroll_student(cid, safety).unwrap();
        f.directory.enroll_student(amy, safety).unwrap();

        // 班组 ∪ 模块
        let union = f
            .generator
            .resolve_subjects(
                f.site,
                &SubjectFilter {
                    student_ids: vec![],
                    group_ids: vec![welding],
                    module_ids: vec![safety],
                },
            )
            .unwrap();
        let ids: Vec<i64> = union.students.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![amy, cid]);
        assert_eq!(union.module_label.as_deref(), Some("Safety"));

        // 指定学员覆盖其他条件
        let custom = f
            .generator
            .resolve_subjects(
                f.site,
                &SubjectFilter {
                    student_ids: vec![ben],
                    group_ids: vec![welding],
                    module_ids: vec![safety],
                },
            )
            .unwrap();
        assert_eq!(custom.students.len(), 1);
        assert_eq!(custom.students[0].student_name, "Ben");
        assert_eq!(custom.module_label, None);

        // 无条件 → 全部
        let all = f.generator.resolve_subjects(f.site, &SubjectFilter::all()).unwrap();
        assert_eq!(all.students.len(), 3);
    }

    #[test]
    fn test_no_subjects_does_not_clear() {
        let f = fixture();
        f.directory.insert_machine(f.site, "Lathe 1", "L1").unwrap();

        let mut config = GenerationConfig::new(monday(), monday());
        config.clear_existing = true;
        let outcome = f
            .generator
            .generate_advanced(&GenerationRequest {
                tenant_id: f.site,
                config,
                filter: SubjectFilter::all(),
                machine_ids: vec![],
            })
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::NoSubjects);
        assert_eq!(outcome.scheduled_count, 0);
        assert_eq!(outcome.cleared_count, 0);
    }

    #[test]
    fn test_no_machines_writes_nothing() {
        let f = fixture();
        f.directory.insert_student(f.site, None, "Amy", None).unwrap();

        let outcome = f
            .generator
            .generate_basic(f.site, &GenerationConfig::new(monday(), monday()))
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::NoResources);
        assert_eq!(f.store.count(f.site).unwrap(), 0);
    }

    #[test]
    fn test_basic_generation_clears_and_schedules_weekends() {
        let f = fixture();
        f.directory.insert_machine(f.site, "Lathe 1", "L1").unwrap();
        for name in ["Amy", "Ben", "Cid"] {
            f.directory.insert_student(f.site, None, name, None).unwrap();
        }

        // 周六单日：基础生成允许全部七天
        let saturday = monday() + chrono::Days::new(5);
        let mut config = GenerationConfig::new(saturday, saturday);
        config.daily_end_time = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        config.priority_rule = PriorityRule::Spt;

        let first = f.generator.generate_basic(f.site, &config).unwrap();
        assert_eq!(first.scheduled_count, 3);
        assert_eq!(first.stop_reason, StopReason::Completed);

        let second = f.generator.generate_basic(f.site, &config).unwrap();
        assert_eq!(second.cleared_count, 3);
        assert_eq!(f.store.count(f.site).unwrap(), 3);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_advanced_append_without_clearing() {
        let f = fixture();
        f.directory.insert_machine(f.site, "Lathe 1", "L1").unwrap();
        f.directory.insert_student(f.site, None, "Amy", None).unwrap();

        let request = GenerationRequest {
            tenant_id: f.site,
            config: GenerationConfig::new(monday(), monday()),
            filter: SubjectFilter::all(),
            machine_ids: vec![],
        };
        f.generator.generate_advanced(&request).unwrap();
        f.generator.generate_advanced(&request).unwrap();

        // 追加且不做冲突检查：同一时段出现两次
        let entries = f.store.list_all(f.site).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].slot(), entries[1].slot());
    }

    #[test]
    fn test_invalid_config_rejected_before_any_write() {
        let f = fixture();
        f.directory.insert_machine(f.site, "Lathe 1", "L1").unwrap();
        f.directory.insert_student(f.site, None, "Amy", None).unwrap();

        let config = GenerationConfig::new(monday() + chrono::Days::new(1), monday());
        let err = f.generator.generate_basic(f.site, &config).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig(_)));
        assert_eq!(f.store.count(f.site).unwrap(), 0);
    }
}
