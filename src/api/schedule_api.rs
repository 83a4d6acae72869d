// ==========================================
// 培训中心排课系统 - 课表 API
// ==========================================
// 职责:
// - 基础/高级排课生成（表单 → GenerationConfig → ScheduleGenerator）
// - 人工批量新增（学员 × 机台逐对冲突检查）
// - 单条时段新增/编辑/删除（冲突时整体拒绝）
// - 课表查询（全部/按日/按区间/按学员/按机台）
// 说明: 姓名 → 学员的匹配只在本层发生，引擎内部只用学员ID
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult, ConflictDetail};
use crate::api::flash::FlashMessage;
use crate::api::forms::{
    parse_advanced_generation, parse_basic_generation, parse_manual_add, parse_slot_form, FormFields, SlotForm,
};
use crate::config::config_manager::{ConfigManager, ScheduleDefaults};
use crate::config::generation_config::{parse_date, parse_form_datetime, FORM_DATETIME_FORMAT, TIME_FORMAT};
use crate::domain::schedule::{NewScheduleEntry, ScheduleEntry, SlotCandidate, TimeSlot};
use crate::engine::conflict::ConflictChecker;
use crate::engine::orchestrator::{GenerationOutcome, ScheduleGenerator};
use crate::i18n::{t, t_with_args};
use crate::repository::directory_repo::DirectoryRepository;
use crate::repository::directory_trait::Directory;
use crate::repository::schedule_repo::ScheduleEntryRepository;
use crate::repository::schedule_store_trait::ScheduleStore;

/// 冲突提示中列出的最大条数
pub const CONFLICT_SUMMARY_LIMIT: usize = 10;

// ==========================================
// 响应类型
// ==========================================

/// 人工批量新增结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAddReport {
    pub added: usize,
    pub conflicts: Vec<String>, // "学员 → 机台 @ HH:MM-HH:MM"
}

impl ManualAddReport {
    /// 提示消息: 新增数量 (success) + 冲突摘要 (warning，最多列出 10 条)
    pub fn flash_messages(&self) -> Vec<FlashMessage> {
        let mut messages = Vec::new();
        if self.added > 0 {
            let added = self.added.to_string();
            messages.push(FlashMessage::success(t_with_args(
                "manual.added",
                &[("count", added.as_str())],
            )));
        }
        if !self.conflicts.is_empty() {
            let count = self.conflicts.len().to_string();
            let summary = conflict_summary(&self.conflicts);
            messages.push(FlashMessage::warning(t_with_args(
                "manual.conflicts",
                &[("count", count.as_str()), ("summary", summary.as_str())],
            )));
        }
        messages
    }
}

/// 编辑对话框使用的时段视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub id: i64,
    pub student_name: String,
    pub machine_name: String,
    pub start_time: String, // YYYY-MM-DDTHH:MM
    pub end_time: String,
    pub group_name: Option<String>,
}

impl From<&ScheduleEntry> for SlotView {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            student_name: entry.subject_name.clone(),
            machine_name: entry.resource_name.clone(),
            start_time: entry.start_time.format(FORM_DATETIME_FORMAT).to_string(),
            end_time: entry.end_time.format(FORM_DATETIME_FORMAT).to_string(),
            group_name: entry.group_name.clone(),
        }
    }
}

// ==========================================
// ScheduleApi
// ==========================================
pub struct ScheduleApi {
    store: Arc<ScheduleEntryRepository>,
    directory: Arc<DirectoryRepository>,
    config_manager: Arc<ConfigManager>,
    generator: ScheduleGenerator<ScheduleEntryRepository, DirectoryRepository>,
    checker: ConflictChecker<ScheduleEntryRepository>,
}

impl ScheduleApi {
    pub fn new(
        store: Arc<ScheduleEntryRepository>,
        directory: Arc<DirectoryRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        let generator = ScheduleGenerator::new(store.clone(), directory.clone());
        let checker = ConflictChecker::new(store.clone());
        Self {
            store,
            directory,
            config_manager,
            generator,
            checker,
        }
    }

    /// 站点排课默认值（午休、工作日、间隔）
    pub fn schedule_defaults(&self, tenant_id: i64) -> ApiResult<ScheduleDefaults> {
        Ok(self.config_manager.load_schedule_defaults(tenant_id)?)
    }

    // ==========================================
    // 排课生成
    // ==========================================

    /// 基础生成（清空站点课表后重排全部学员）
    #[instrument(skip(self, fields))]
    pub fn generate_schedule(&self, tenant_id: i64, fields: &FormFields) -> ApiResult<GenerationOutcome> {
        let defaults = self.schedule_defaults(tenant_id)?;
        let config = parse_basic_generation(fields, &defaults)?;
        Ok(self.generator.generate_basic(tenant_id, &config)?)
    }

    /// 高级生成（范围筛选、考试批次、工作日白名单）
    #[instrument(skip(self, fields))]
    pub fn generate_schedule_advanced(&self, tenant_id: i64, fields: &FormFields) -> ApiResult<GenerationOutcome> {
        let defaults = self.schedule_defaults(tenant_id)?;
        let request = parse_advanced_generation(fields, &defaults, tenant_id)?;
        Ok(self.generator.generate_advanced(&request)?)
    }

    // ==========================================
    // 人工批量新增
    // ==========================================

    /// 人工批量新增
    ///
    /// # 规则
    /// - 学员 = 直接选择 ∪ 所选班组成员（保持首次出现顺序去重）
    /// - 外层机台、内层学员，逐对检查冲突
    /// - 冲突对跳过并记录，其余写入
    #[instrument(skip(self, fields))]
    pub fn manual_add_schedule(&self, tenant_id: i64, fields: &FormFields) -> ApiResult<ManualAddReport> {
        let form = parse_manual_add(fields)?;

        if form.students.is_empty() && form.groups.is_empty() {
            return Err(ApiError::InvalidInput(t("manual.no_subjects")));
        }
        if form.machines.is_empty() {
            return Err(ApiError::InvalidInput(t("manual.no_machines")));
        }
        ensure_ordered(&form.slot)?;

        let mut names: Vec<String> = form.students.clone();
        for group_name in &form.groups {
            let members = self.directory.find_students_by_group_name(tenant_id, group_name)?;
            names.extend(members.into_iter().map(|s| s.student_name));
        }
        let names = dedup_keep_order(names);

        let mut report = ManualAddReport::default();
        for machine in &form.machines {
            for name in &names {
                let candidate = SlotCandidate::new(name, machine, form.slot);
                if self.checker.has_conflict(tenant_id, &candidate, None)? {
                    report.conflicts.push(format!(
                        "{} → {} @ {}-{}",
                        name,
                        machine,
                        form.slot.start.format(TIME_FORMAT),
                        form.slot.end.format(TIME_FORMAT)
                    ));
                    continue;
                }
                let entry = self.manual_entry(tenant_id, name, machine, form.slot)?;
                self.store.insert(&entry)?;
                report.added += 1;
            }
        }

        info!(
            tenant_id,
            added = report.added,
            conflicts = report.conflicts.len(),
            "人工批量新增完成"
        );
        Ok(report)
    }

    // ==========================================
    // 单条时段写入
    // ==========================================

    /// 日历拖拽更新（时间必填，学员/机台缺省沿用原值，改学员时按名录刷新）
    #[instrument(skip(self, fields))]
    pub fn update_schedule(&self, tenant_id: i64, id: i64, fields: &FormFields) -> ApiResult<ScheduleEntry> {
        let form = parse_slot_form(fields)?;
        let mut entry = self.require_entry(tenant_id, id)?;

        let (start, end) = match (form.start_time, form.end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ApiError::InvalidInput(t("slot.missing_fields"))),
        };
        if let Some(name) = form.student_name {
            entry.subject_name = name;
            self.refresh_subject(tenant_id, &mut entry)?;
        }
        if let Some(machine) = form.machine_name {
            entry.resource_name = machine;
        }
        entry.start_time = start;
        entry.end_time = end;

        self.write_checked(entry, "slot.update_conflict")
    }

    /// 新增单条时段（学员、机台、起止时间均必填）
    #[instrument(skip(self, fields))]
    pub fn add_slot(&self, tenant_id: i64, fields: &FormFields) -> ApiResult<ScheduleEntry> {
        let form = parse_slot_form(fields)?;
        let (student, machine, start, end) = match form {
            SlotForm {
                student_name: Some(student),
                machine_name: Some(machine),
                start_time: Some(start),
                end_time: Some(end),
            } => (student, machine, start, end),
            _ => return Err(ApiError::InvalidInput(t("slot.missing_fields"))),
        };

        let slot = TimeSlot::new(start, end);
        ensure_ordered(&slot)?;

        let candidate = SlotCandidate::new(&student, &machine, slot);
        self.reject_conflicts(tenant_id, &candidate, None, "slot.conflict")?;

        let new_entry = self.manual_entry(tenant_id, &student, &machine, slot)?;
        let id = self.store.insert(&new_entry)?;
        info!(tenant_id, id, student = %student, machine = %machine, "新增时段");
        self.require_entry(tenant_id, id)
    }

    /// 编辑对话框数据
    pub fn get_slot(&self, tenant_id: i64, id: i64) -> ApiResult<SlotView> {
        let entry = self.require_entry(tenant_id, id)?;
        Ok(SlotView::from(&entry))
    }

    /// 编辑单条时段（字段均可选，改学员时按名录刷新学员ID与班组）
    #[instrument(skip(self, fields))]
    pub fn edit_slot(&self, tenant_id: i64, id: i64, fields: &FormFields) -> ApiResult<ScheduleEntry> {
        let form = parse_slot_form(fields)?;
        let mut entry = self.require_entry(tenant_id, id)?;

        if let Some(name) = form.student_name {
            entry.subject_name = name;
            self.refresh_subject(tenant_id, &mut entry)?;
        }
        if let Some(machine) = form.machine_name {
            entry.resource_name = machine;
        }
        if let Some(start) = form.start_time {
            entry.start_time = start;
        }
        if let Some(end) = form.end_time {
            entry.end_time = end;
        }

        self.write_checked(entry, "slot.conflict")
    }

    /// 删除单条时段（不做冲突检查）
    #[instrument(skip(self))]
    pub fn delete_slot(&self, tenant_id: i64, id: i64) -> ApiResult<()> {
        if !self.store.delete_by_id(tenant_id, id)? {
            return Err(ApiError::NotFound(t("slot.not_found")));
        }
        info!(tenant_id, id, "删除时段");
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn list_schedule(&self, tenant_id: i64) -> ApiResult<Vec<ScheduleEntry>> {
        Ok(self.store.list_all(tenant_id)?)
    }

    /// 日视图: 当日开始的条目
    pub fn schedule_for_day(&self, tenant_id: i64, date: &str) -> ApiResult<Vec<ScheduleEntry>> {
        let date = parse_date("date", date)?;
        Ok(self.store.find_starting_on(tenant_id, date)?)
    }

    /// 区间视图: 与 [start, end) 重叠的条目
    ///
    /// 边界可为日期或时间戳；仅日期的 end 表示当日结束
    pub fn schedule_in_range(&self, tenant_id: i64, start: &str, end: &str) -> ApiResult<Vec<ScheduleEntry>> {
        let range = TimeSlot::new(range_bound("start", start, false)?, range_bound("end", end, true)?);
        ensure_ordered(&range)?;
        Ok(self.store.find_by_time_range(tenant_id, &range)?)
    }

    pub fn schedule_for_student(&self, tenant_id: i64, student_name: &str) -> ApiResult<Vec<ScheduleEntry>> {
        Ok(self.store.find_by_subject(tenant_id, student_name)?)
    }

    pub fn schedule_for_machine(&self, tenant_id: i64, machine_name: &str) -> ApiResult<Vec<ScheduleEntry>> {
        Ok(self.store.find_by_resource(tenant_id, machine_name)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_entry(&self, tenant_id: i64, id: i64) -> ApiResult<ScheduleEntry> {
        self.store
            .find_by_id(tenant_id, id)?
            .ok_or_else(|| ApiError::NotFound(t("slot.not_found")))
    }

    /// 人工条目: 学员ID与班组名从名录补充（名录中不存在时留空）
    fn manual_entry(&self, tenant_id: i64, name: &str, machine: &str, slot: TimeSlot) -> ApiResult<NewScheduleEntry> {
        let (subject_id, group_name) = self.resolve_subject(tenant_id, name)?;
        Ok(NewScheduleEntry::manual(tenant_id, subject_id, name, machine, group_name, slot))
    }

    /// 名称 → (学员ID, 班组名)；名录中找不到时均为 None
    fn resolve_subject(&self, tenant_id: i64, name: &str) -> ApiResult<(Option<i64>, Option<String>)> {
        Ok(match self.directory.find_student_by_name(tenant_id, name)? {
            Some(student) => (Some(student.id), student.group_name),
            None => (None, None),
        })
    }

    /// 按当前学员名重新解析 subject_id / group_name
    fn refresh_subject(&self, tenant_id: i64, entry: &mut ScheduleEntry) -> ApiResult<()> {
        let (subject_id, group_name) = self.resolve_subject(tenant_id, &entry.subject_name)?;
        entry.subject_id = subject_id;
        entry.group_name = group_name;
        Ok(())
    }

    fn reject_conflicts(
        &self,
        tenant_id: i64,
        candidate: &SlotCandidate,
        exclude_id: Option<i64>,
        message_key: &str,
    ) -> ApiResult<()> {
        let conflicts = self.checker.find_conflicts(tenant_id, candidate, exclude_id)?;
        if conflicts.is_empty() {
            return Ok(());
        }
        warn!(
            tenant_id,
            student = %candidate.subject_name,
            machine = %candidate.resource_name,
            conflicts = conflicts.len(),
            "时段冲突，拒绝写入"
        );
        Err(ApiError::ScheduleConflict {
            message: t(message_key),
            conflicts: conflicts.iter().map(ConflictDetail::from).collect(),
        })
    }

    /// 校验时段并排除自身检查冲突，通过后原位更新
    fn write_checked(&self, entry: ScheduleEntry, conflict_key: &str) -> ApiResult<ScheduleEntry> {
        let slot = entry.slot();
        ensure_ordered(&slot)?;

        let candidate = SlotCandidate::new(&entry.subject_name, &entry.resource_name, slot);
        self.reject_conflicts(entry.tenant_id, &candidate, Some(entry.id), conflict_key)?;

        self.store.update(&entry)?;
        info!(tenant_id = entry.tenant_id, id = entry.id, "更新时段");
        Ok(entry)
    }
}

// ==========================================
// 工具函数
// ==========================================

fn ensure_ordered(slot: &TimeSlot) -> ApiResult<()> {
    if slot.start >= slot.end {
        return Err(ApiError::InvalidInput(t("slot.invalid_range")));
    }
    Ok(())
}

fn dedup_keep_order(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}

fn conflict_summary(conflicts: &[String]) -> String {
    let mut lines: Vec<String> = conflicts.iter().take(CONFLICT_SUMMARY_LIMIT).cloned().collect();
    if conflicts.len() > CONFLICT_SUMMARY_LIMIT {
        let more = (conflicts.len() - CONFLICT_SUMMARY_LIMIT).to_string();
        lines.push(t_with_args("manual.more", &[("count", more.as_str())]));
    }
    lines.join("\n")
}

fn range_bound(field: &str, raw: &str, is_end: bool) -> ApiResult<NaiveDateTime> {
    if let Ok(ts) = parse_form_datetime(field, raw) {
        return Ok(ts);
    }
    let date = parse_date(field, raw)?;
    let date = if is_end {
        date.checked_add_days(Days::new(1))
            .ok_or_else(|| ApiError::InvalidInput(format!("{} 超出日期范围", field)))?
    } else {
        date
    };
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct Fixture {
        api: ScheduleApi,
        directory: Arc<DirectoryRepository>,
        store: Arc<ScheduleEntryRepository>,
        site: i64,
    }

    fn fixture() -> Fixture {
        let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let store = Arc::new(ScheduleEntryRepository::from_connection(conn.clone()));
        let directory = Arc::new(DirectoryRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));
        let site = directory.insert_site("North Campus").unwrap();
        let api = ScheduleApi::new(store.clone(), directory.clone(), config_manager);
        Fixture {
            api,
            directory,
            store,
            site,
        }
    }

    fn form(pairs: &[(&str, &str)]) -> FormFields {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn slot_form(student: &str, machine: &str, start: &str, end: &str) -> FormFields {
        form(&[
            ("student_name", student),
            ("machine_name", machine),
            ("start_time", start),
            ("end_time", end),
        ])
    }

    #[test]
    fn test_add_slot_rejects_overlap_and_lists_conflict() {
        let f = fixture();
        let first = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();

        let err = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:30", "2024-03-04T10:30"))
            .unwrap_err();
        match err {
            ApiError::ScheduleConflict { conflicts, .. } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, first.id);
            }
            other => panic!("Expected ScheduleConflict, got {:?}", other),
        }

        // 端点相接允许
        f.api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T10:00", "2024-03-04T11:00"))
            .unwrap();
        assert_eq!(f.store.count(f.site).unwrap(), 2);
    }

    #[test]
    fn test_add_slot_validation() {
        let f = fixture();
        let err = f
            .api
            .add_slot(f.site, &form(&[("student_name", "Amy"), ("start_time", "2024-03-04T09:00")]))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T10:00", "2024-03-04T10:00"))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_add_slot_fills_group_from_directory() {
        let f = fixture();
        let group = f.directory.insert_group(f.site, "Welding A").unwrap();
        let amy = f.directory.insert_student(f.site, Some("AGP24101"), "Amy", Some(group)).unwrap();

        let entry = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();
        assert_eq!(entry.subject_id, Some(amy));
        assert_eq!(entry.group_name.as_deref(), Some("Welding A"));

        let view = f.api.get_slot(f.site, entry.id).unwrap();
        assert_eq!(view.start_time, "2024-03-04T09:00");
        assert_eq!(view.group_name.as_deref(), Some("Welding A"));
    }

    #[test]
    fn test_manual_add_expands_groups_and_collects_conflicts() {
        let f = fixture();
        let group = f.directory.insert_group(f.site, "Welding A").unwrap();
        f.directory.insert_student(f.site, None, "Amy", Some(group)).unwrap();
        f.directory.insert_student(f.site, None, "Ben", Some(group)).unwrap();

        f.api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();

        let report = f
            .api
            .manual_add_schedule(
                f.site,
                &form(&[
                    ("students[]", "Amy"),
                    ("groups[]", "Welding A"),
                    ("machines[]", "Lathe 1"),
                    ("machines[]", "Lathe 2"),
                    ("date", "2024-03-04"),
                    ("start_time", "09:30"),
                    ("end_time", "10:30"),
                ]),
            )
            .unwrap();

        // Amy 只计一次: Lathe 1 冲突，其余 3 对写入
        assert_eq!(report.added, 3);
        assert_eq!(report.conflicts, vec!["Amy → Lathe 1 @ 09:30-10:30".to_string()]);
        assert_eq!(f.store.count(f.site).unwrap(), 4);
        assert_eq!(report.flash_messages().len(), 2);
    }

    #[test]
    fn test_manual_add_requires_subjects() {
        let f = fixture();
        let err = f
            .api
            .manual_add_schedule(
                f.site,
                &form(&[
                    ("machines", "Lathe 1"),
                    ("date", "2024-03-04"),
                    ("start_time", "09:00"),
                    ("end_time", "10:00"),
                ]),
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert_eq!(f.store.count(f.site).unwrap(), 0);
    }

    #[test]
    fn test_update_and_edit_exclude_self() {
        let f = fixture();
        let a = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();
        let b = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T11:00", "2024-03-04T12:00"))
            .unwrap();

        // 移动自身不算冲突
        let moved = f
            .api
            .update_schedule(
                f.site,
                a.id,
                &form(&[("start_time", "2024-03-04T09:30"), ("end_time", "2024-03-04T10:30")]),
            )
            .unwrap();
        assert_eq!(moved.resource_name, "Lathe 1");

        // 与 b 重叠被拒绝，原记录不变
        let err = f
            .api
            .edit_slot(f.site, a.id, &form(&[("end_time", "2024-03-04T11:30")]))
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        let stored = f.store.find_by_id(f.site, a.id).unwrap().unwrap();
        assert_eq!(stored.end_time, moved.end_time);

        // 换机台后不再冲突
        let edited = f
            .api
            .edit_slot(
                f.site,
                a.id,
                &form(&[("machine_name", "Lathe 2"), ("end_time", "2024-03-04T11:30")]),
            )
            .unwrap();
        assert_eq!(edited.resource_name, "Lathe 2");
        assert_eq!(f.api.schedule_for_machine(f.site, "Lathe 1").unwrap()[0].id, b.id);
    }

    #[test]
    fn test_update_requires_times_and_existing_id() {
        let f = fixture();
        let err = f
            .api
            .update_schedule(
                f.site,
                99,
                &form(&[("start_time", "2024-03-04T09:00"), ("end_time", "2024-03-04T10:00")]),
            )
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let a = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();
        let err = f
            .api
            .update_schedule(f.site, a.id, &form(&[("start_time", "2024-03-04T09:30")]))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_delete_slot() {
        let f = fixture();
        let a = f
            .api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();
        f.api.delete_slot(f.site, a.id).unwrap();
        assert_eq!(f.api.delete_slot(f.site, a.id).unwrap_err().status_code(), 404);
    }

    #[test]
    fn test_range_queries() {
        let f = fixture();
        f.api
            .add_slot(f.site, &slot_form("Amy", "Lathe 1", "2024-03-04T09:00", "2024-03-04T10:00"))
            .unwrap();
        f.api
            .add_slot(f.site, &slot_form("Ben", "Lathe 1", "2024-03-05T09:00", "2024-03-05T10:00"))
            .unwrap();

        assert_eq!(f.api.schedule_for_day(f.site, "2024-03-04").unwrap().len(), 1);
        assert_eq!(f.api.schedule_in_range(f.site, "2024-03-04", "2024-03-04").unwrap().len(), 1);
        assert_eq!(f.api.schedule_in_range(f.site, "2024-03-04", "2024-03-05").unwrap().len(), 2);
        assert_eq!(
            f.api
                .schedule_in_range(f.site, "2024-03-04T09:30", "2024-03-04T09:45")
                .unwrap()
                .len(),
            1
        );
        assert!(f.api.schedule_in_range(f.site, "2024-03-05", "2024-03-04").is_err());
        assert_eq!(f.api.schedule_for_student(f.site, "Ben").unwrap().len(), 1);
    }

    #[test]
    fn test_conflict_summary_truncates() {
        let conflicts: Vec<String> = (0..12).map(|i| format!("S{} → M @ 09:00-10:00", i)).collect();
        let summary = conflict_summary(&conflicts);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), CONFLICT_SUMMARY_LIMIT + 1);
        assert!(lines[CONFLICT_SUMMARY_LIMIT].contains('2'));
        assert!(!summary.contains("S10"));
    }
}
