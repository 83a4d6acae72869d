// ==========================================
// 培训中心排课系统 - 排课生成配置
// ==========================================
// 职责: 单次生成运行的参数（表单解析后在边界完成校验）
// 约束: daily_end > daily_start, end_date >= start_date,
//       工作日白名单非空且编号在 0..=6
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::types::{GenerationScope, PriorityRule, SessionKind, WeekdaySet};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const FORM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// 每个考试时段学员数上限（capacity 列为 INTEGER，需可放入 i32）
pub const MAX_SESSIONS_PER_BATCH: u32 = i32::MAX as u32;

// ==========================================
// ConfigError - 配置错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("缺少必填字段: {0}")]
    MissingField(String),

    #[error("字段格式错误 (field={field}): {message}")]
    InvalidFormat { field: String, message: String },

    #[error("字段取值超出范围 (field={field}): {message}")]
    OutOfRange { field: String, message: String },

    #[error("每日结束时间({end})必须晚于开始时间({start})")]
    DailyWindowInverted { start: NaiveTime, end: NaiveTime },

    #[error("结束日期({end})不能早于开始日期({start})")]
    DateRangeInverted { start: NaiveDate, end: NaiveDate },

    #[error("至少需要选择一个工作日")]
    NoWeekdays,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// GenerationConfig - 生成配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub session_kind: SessionKind,
    pub sessions_per_batch: u32, // 每个考试时段的学员数 (>= 1)
    pub slot_duration_minutes: u32,
    pub scope: GenerationScope,
    pub priority_rule: PriorityRule,
    pub clear_existing: bool,
    pub notes: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start_time: NaiveTime,
    pub daily_end_time: NaiveTime,
    pub lunch_start_time: NaiveTime,
    pub lunch_duration_minutes: u32,
    pub inter_slot_gap_minutes: u32,
    pub allowed_weekdays: WeekdaySet,
    pub same_resource_for_batch: bool,

    // 接收但不参与计算
    pub threshold_mark: Option<f64>,
    pub auto_extra_time_minutes: Option<u32>,
}

impl GenerationConfig {
    /// 以默认参数构造（测试与种子数据使用）
    ///
    /// 默认: 实操课、60 分钟、08:00-17:00、12:00 午休 60 分钟、周一至周五
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            session_kind: SessionKind::Practical,
            sessions_per_batch: 1,
            slot_duration_minutes: 60,
            scope: GenerationScope::All,
            priority_rule: PriorityRule::Fifo,
            clear_existing: false,
            notes: None,
            start_date,
            end_date,
            daily_start_time: hm(8, 0),
            daily_end_time: hm(17, 0),
            lunch_start_time: hm(12, 0),
            lunch_duration_minutes: 60,
            inter_slot_gap_minutes: 0,
            allowed_weekdays: WeekdaySet::weekdays(),
            same_resource_for_batch: false,
            threshold_mark: None,
            auto_extra_time_minutes: None,
        }
    }

    /// 校验配置
    ///
    /// # 返回
    /// - Ok(()): 配置合法
    /// - Err(ConfigError): 第一个不满足的约束
    pub fn validate(&self) -> ConfigResult<()> {
        if self.slot_duration_minutes == 0 {
            return Err(ConfigError::OutOfRange {
                field: "slot_duration".to_string(),
                message: "必须大于 0".to_string(),
            });
        }
        if self.sessions_per_batch == 0 || self.sessions_per_batch > MAX_SESSIONS_PER_BATCH {
            return Err(ConfigError::OutOfRange {
                field: "students_per_session".to_string(),
                message: format!("必须在 1..={} 之间", MAX_SESSIONS_PER_BATCH),
            });
        }
        if self.daily_end_time <= self.daily_start_time {
            return Err(ConfigError::DailyWindowInverted {
                start: self.daily_start_time,
                end: self.daily_end_time,
            });
        }
        if self.end_date < self.start_date {
            return Err(ConfigError::DateRangeInverted {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.allowed_weekdays.is_empty() {
            return Err(ConfigError::NoWeekdays);
        }
        Ok(())
    }

    /// 排课起点: start_date + daily_start_time
    pub fn start_instant(&self) -> NaiveDateTime {
        self.start_date.and_time(self.daily_start_time)
    }

    /// 排课终点 (horizon): end_date + daily_end_time
    pub fn horizon(&self) -> NaiveDateTime {
        self.end_date.and_time(self.daily_end_time)
    }

    /// 是否为考试批次模式
    pub fn is_batch_mode(&self) -> bool {
        self.session_kind.is_test() && self.sessions_per_batch > 1
    }

    /// 单个时段的容量（批次模式 = sessions_per_batch，否则 1）
    pub fn slot_capacity(&self) -> u32 {
        if self.is_batch_mode() {
            self.sessions_per_batch
        } else {
            1
        }
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

// ==========================================
// 表单字段解析辅助
// ==========================================

/// 解析日期 (YYYY-MM-DD)
pub fn parse_date(field: &str, raw: &str) -> ConfigResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| ConfigError::InvalidFormat {
        field: field.to_string(),
        message: format!("'{}' 不是有效日期 ({})", raw, e),
    })
}

/// 解析时刻 (HH:MM，兼容 HH:MM:SS)
pub fn parse_time(field: &str, raw: &str) -> ConfigResult<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|e| ConfigError::InvalidFormat {
            field: field.to_string(),
            message: format!("'{}' 不是有效时刻 ({})", raw, e),
        })
}

/// 解析表单时间戳 (YYYY-MM-DDTHH:MM，兼容秒与空格分隔)
pub fn parse_form_datetime(field: &str, raw: &str) -> ConfigResult<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, FORM_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
        .map_err(|e| ConfigError::InvalidFormat {
            field: field.to_string(),
            message: format!("'{}' 不是有效时间 ({})", raw, e),
        })
}

/// 解析非负整数（分钟数等）
pub fn parse_u32(field: &str, raw: &str) -> ConfigResult<u32> {
    raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidFormat {
        field: field.to_string(),
        message: format!("'{}' 不是非负整数", raw),
    })
}

/// 解析正整数
pub fn parse_positive_u32(field: &str, raw: &str) -> ConfigResult<u32> {
    let value = parse_u32(field, raw)?;
    if value == 0 {
        return Err(ConfigError::OutOfRange {
            field: field.to_string(),
            message: "必须大于 0".to_string(),
        });
    }
    Ok(value)
}

pub fn parse_f64(field: &str, raw: &str) -> ConfigResult<f64> {
    raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidFormat {
        field: field.to_string(),
        message: format!("'{}' 不是数值", raw),
    })
}

pub fn parse_i64(field: &str, raw: &str) -> ConfigResult<i64> {
    raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidFormat {
        field: field.to_string(),
        message: format!("'{}' 不是整数ID", raw),
    })
}

/// 复选框取值: "on"/"true"/"1"/"yes" 为真
pub fn parse_checkbox(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("on") | Some("true") | Some("1") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = GenerationConfig::new(d(2024, 3, 4), d(2024, 3, 8));
        assert!(config.validate().is_ok());
        assert_eq!(config.horizon(), d(2024, 3, 8).and_hms_opt(17, 0, 0).unwrap());
        assert!(!config.is_batch_mode());
        assert_eq!(config.slot_capacity(), 1);
    }

    #[test]
    fn test_validate_rejects_inverted_windows() {
        let mut config = GenerationConfig::new(d(2024, 3, 8), d(2024, 3, 4));
        assert!(matches!(config.validate(), Err(ConfigError::DateRangeInverted { .. })));

        config.end_date = d(2024, 3, 8);
        config.daily_end_time = config.daily_start_time;
        assert!(matches!(config.validate(), Err(ConfigError::DailyWindowInverted { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_weekdays_and_zero_duration() {
        let mut config = GenerationConfig::new(d(2024, 3, 4), d(2024, 3, 4));
        config.allowed_weekdays = WeekdaySet::from_indices(Vec::new()).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::NoWeekdays));

        let mut config = GenerationConfig::new(d(2024, 3, 4), d(2024, 3, 4));
        config.slot_duration_minutes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_validate_bounds_sessions_per_batch() {
        let mut config = GenerationConfig::new(d(2024, 3, 4), d(2024, 3, 4));
        config.session_kind = SessionKind::WrittenTest;

        config.sessions_per_batch = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        config.sessions_per_batch = 3_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "students_per_session"
        ));

        config.sessions_per_batch = MAX_SESSIONS_PER_BATCH;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_mode_requires_test_kind() {
        let mut config = GenerationConfig::new(d(2024, 3, 4), d(2024, 3, 4));
        config.sessions_per_batch = 4;
        assert!(!config.is_batch_mode());

        config.session_kind = SessionKind::WrittenTest;
        assert!(config.is_batch_mode());
        assert_eq!(config.slot_capacity(), 4);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_date("start_date", "2024-03-04").unwrap(), d(2024, 3, 4));
        assert!(parse_date("start_date", "04/03/2024").is_err());

        assert_eq!(parse_time("start_time", "08:30").unwrap(), hm(8, 30));
        assert_eq!(parse_time("start_time", "08:30:00").unwrap(), hm(8, 30));
        assert!(parse_time("start_time", "8h30").is_err());

        assert_eq!(
            parse_form_datetime("start_time", "2024-03-04T09:00").unwrap(),
            d(2024, 3, 4).and_hms_opt(9, 0, 0).unwrap()
        );

        assert!(parse_positive_u32("slot_duration", "0").is_err());
        assert!(parse_u32("allowance_time", "-5").is_err());
        assert_eq!(parse_u32("allowance_time", " 15 ").unwrap(), 15);

        assert!(parse_checkbox(Some("on")));
        assert!(!parse_checkbox(Some("off")));
        assert!(!parse_checkbox(None));
    }
}
