// ==========================================
// 培训中心排课系统 - 表单解析
// ==========================================
// 职责: 原始表单键值 → 类型化请求
// 说明: 多选字段同时接受 `key` 与 `key[]` 两种写法
// ==========================================

use chrono::NaiveDateTime;

use crate::config::config_manager::ScheduleDefaults;
use crate::config::generation_config::{
    parse_checkbox, parse_date, parse_f64, parse_form_datetime, parse_i64, parse_positive_u32,
    parse_time, parse_u32, ConfigError, ConfigResult, GenerationConfig,
};
use crate::domain::schedule::TimeSlot;
use crate::domain::types::{GenerationScope, PriorityRule, SessionKind, WeekdaySet};
use crate::engine::orchestrator::{GenerationRequest, SubjectFilter};

// ==========================================
// FormFields - 表单键值（保留重复键）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// 单值字段（取第一个非空值，去除首尾空白）
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    /// 多值字段（`key` 与 `key[]`，忽略空值）
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        let bracketed = format!("{}[]", key);
        self.pairs
            .iter()
            .filter(|(k, _)| k == key || *k == bracketed)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    pub fn required(&self, key: &str) -> ConfigResult<&str> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))
    }

    fn ids(&self, key: &str) -> ConfigResult<Vec<i64>> {
        self.get_all(key)
            .into_iter()
            .map(|raw| parse_i64(key, raw))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ==========================================
// 基础生成表单
// ==========================================

/// 解析 /generate_schedule 表单
///
/// 必填: slot_duration, start_date, end_date, start_time, end_time
/// 可选: lunch_start, lunch_duration, allowance_time, priority_rule,
///       threshold_mark, auto_extra_time
pub fn parse_basic_generation(fields: &FormFields, defaults: &ScheduleDefaults) -> ConfigResult<GenerationConfig> {
    let start_date = parse_date("start_date", fields.required("start_date")?)?;
    let end_date = parse_date("end_date", fields.required("end_date")?)?;

    let mut config = GenerationConfig::new(start_date, end_date);
    config.slot_duration_minutes = parse_positive_u32("slot_duration", fields.required("slot_duration")?)?;
    apply_daily_window(&mut config, fields, defaults)?;

    config.priority_rule = parse_priority_rule(fields)?;
    if !config.priority_rule.is_basic() {
        return Err(ConfigError::OutOfRange {
            field: "priority_rule".to_string(),
            message: format!("基础排课只支持 FIFO/SPT/LPT，收到 {}", config.priority_rule),
        });
    }

    config.clear_existing = true;
    config.allowed_weekdays = WeekdaySet::all_days();
    apply_unused_fields(&mut config, fields)?;

    config.validate()?;
    Ok(config)
}

// ==========================================
// 高级生成表单
// ==========================================

/// 解析 /generate_schedule_advanced 表单
pub fn parse_advanced_generation(
    fields: &FormFields,
    defaults: &ScheduleDefaults,
    tenant_id: i64,
) -> ConfigResult<GenerationRequest> {
    let start_date = parse_date("start_date", fields.required("start_date")?)?;
    let end_date = parse_date("end_date", fields.required("end_date")?)?;

    let mut config = GenerationConfig::new(start_date, end_date);

    if let Some(raw) = fields.get("session_type") {
        config.session_kind = raw.parse::<SessionKind>().map_err(|e| ConfigError::InvalidFormat {
            field: "session_type".to_string(),
            message: e,
        })?;
    }
    if let Some(raw) = fields.get("students_per_session") {
        config.sessions_per_batch = parse_positive_u32("students_per_session", raw)?;
    }
    if let Some(raw) = fields.get("slot_duration") {
        config.slot_duration_minutes = parse_positive_u32("slot_duration", raw)?;
    }
    if let Some(raw) = fields.get("generation_scope") {
        config.scope = raw.parse::<GenerationScope>().map_err(|e| ConfigError::InvalidFormat {
            field: "generation_scope".to_string(),
            message: e,
        })?;
    }
    config.priority_rule = parse_priority_rule(fields)?;
    config.clear_existing = parse_checkbox(fields.get("clear_existing"));
    config.same_resource_for_batch = parse_checkbox(fields.get("same_machine_for_test"));
    config.notes = fields.get("notes").map(str::to_string);

    apply_daily_window(&mut config, fields, defaults)?;

    let days = fields.get_all("days");
    config.allowed_weekdays = if days.is_empty() {
        defaults.allowed_weekdays.clone()
    } else {
        let mut indices = Vec::with_capacity(days.len());
        for raw in days {
            let day = parse_u32("days", raw)?;
            indices.push(u8::try_from(day).unwrap_or(u8::MAX));
        }
        WeekdaySet::from_indices(indices).map_err(|day| ConfigError::OutOfRange {
            field: "days".to_string(),
            message: format!("工作日编号超出范围(0-6): {}", day),
        })?
    };

    apply_unused_fields(&mut config, fields)?;
    config.validate()?;

    let filter = SubjectFilter {
        student_ids: fields.ids("student_ids")?,
        group_ids: fields.ids("group_ids")?,
        module_ids: fields.ids("module_ids")?,
    };
    let machine_ids = fields.ids("machine_ids")?;

    Ok(GenerationRequest {
        tenant_id,
        config,
        filter,
        machine_ids,
    })
}

// ==========================================
// 人工批量新增表单
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualAddForm {
    pub students: Vec<String>,
    pub groups: Vec<String>,
    pub machines: Vec<String>,
    pub slot: TimeSlot,
}

/// 解析 /manual_add_schedule 表单
///
/// date + start_time / end_time 组合成时段；时段合法性由调用方校验
pub fn parse_manual_add(fields: &FormFields) -> ConfigResult<ManualAddForm> {
    let date = parse_date("date", fields.required("date")?)?;
    let start = parse_time("start_time", fields.required("start_time")?)?;
    let end = parse_time("end_time", fields.required("end_time")?)?;

    let owned = |key: &str| -> Vec<String> {
        fields.get_all(key).into_iter().map(str::to_string).collect()
    };

    Ok(ManualAddForm {
        students: owned("students"),
        groups: owned("groups"),
        machines: owned("machines"),
        slot: TimeSlot::new(date.and_time(start), date.and_time(end)),
    })
}

// ==========================================
// 单条时段写入表单
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotForm {
    pub student_name: Option<String>,
    pub machine_name: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

/// 解析单条时段表单（时间格式 YYYY-MM-DDTHH:MM）
pub fn parse_slot_form(fields: &FormFields) -> ConfigResult<SlotForm> {
    let start_time = fields
        .get("start_time")
        .map(|raw| parse_form_datetime("start_time", raw))
        .transpose()?;
    let end_time = fields
        .get("end_time")
        .map(|raw| parse_form_datetime("end_time", raw))
        .transpose()?;

    Ok(SlotForm {
        student_name: fields.get("student_name").map(str::to_string),
        machine_name: fields.get("machine_name").map(str::to_string),
        start_time,
        end_time,
    })
}

// ==========================================
// 内部辅助
// ==========================================

fn parse_priority_rule(fields: &FormFields) -> ConfigResult<PriorityRule> {
    match fields.get("priority_rule") {
        Some(raw) => raw.parse::<PriorityRule>().map_err(|e| ConfigError::InvalidFormat {
            field: "priority_rule".to_string(),
            message: e,
        }),
        None => Ok(PriorityRule::Fifo),
    }
}

fn apply_daily_window(
    config: &mut GenerationConfig,
    fields: &FormFields,
    defaults: &ScheduleDefaults,
) -> ConfigResult<()> {
    config.daily_start_time = parse_time("start_time", fields.required("start_time")?)?;
    config.daily_end_time = parse_time("end_time", fields.required("end_time")?)?;

    config.lunch_start_time = match fields.get("lunch_start") {
        Some(raw) => parse_time("lunch_start", raw)?,
        None => defaults.lunch_start_time,
    };
    config.lunch_duration_minutes = match fields.get("lunch_duration") {
        Some(raw) => parse_u32("lunch_duration", raw)?,
        None => defaults.lunch_duration_minutes,
    };
    config.inter_slot_gap_minutes = match fields.get("allowance_time") {
        Some(raw) => parse_u32("allowance_time", raw)?,
        None => defaults.inter_slot_gap_minutes,
    };
    Ok(())
}

/// threshold_mark / auto_extra_time 只做格式校验，不参与排课
fn apply_unused_fields(config: &mut GenerationConfig, fields: &FormFields) -> ConfigResult<()> {
    config.threshold_mark = fields
        .get("threshold_mark")
        .map(|raw| parse_f64("threshold_mark", raw))
        .transpose()?;
    config.auto_extra_time_minutes = fields
        .get("auto_extra_time")
        .map(|raw| parse_u32("auto_extra_time", raw))
        .transpose()?;
    Ok(())
}
