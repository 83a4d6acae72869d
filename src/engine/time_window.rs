// ==========================================
// 培训中心排课系统 - 时间窗口计算器
// ==========================================
// 职责: 工作日边界、午休区间、跨日/跨午休滚动
// 规则:
// - 午休优先: 时段不得与午休重叠，不截断、不拆分
// - 放不下的时段整体顺延到下一个工作日
// - 恰好结束于午休开始 / 日终 的时段视为可放置
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::generation_config::GenerationConfig;
use crate::domain::schedule::TimeSlot;
use crate::domain::types::WeekdaySet;

// ==========================================
// SlotResolution - 时段解析结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    /// 当日可放置
    Placed(TimeSlot),
    /// 当日放不下，下一日开始时刻重试
    Rollover { next_day_start: NaiveDateTime },
}

// ==========================================
// TimeWindowCalculator
// ==========================================
#[derive(Debug, Clone)]
pub struct TimeWindowCalculator {
    daily_start: NaiveTime,
    daily_end: NaiveTime,
    lunch_start: NaiveTime,
    lunch_duration: Duration,
    allowed_weekdays: WeekdaySet,
    horizon: NaiveDateTime,
}

impl TimeWindowCalculator {
    /// 构造函数
    ///
    /// # 参数
    /// - daily_start / daily_end: 每日工作时间
    /// - lunch_start / lunch_duration_minutes: 每日午休
    /// - allowed_weekdays: 工作日白名单
    /// - horizon: 排课终点（不含）
    pub fn new(
        daily_start: NaiveTime,
        daily_end: NaiveTime,
        lunch_start: NaiveTime,
        lunch_duration_minutes: u32,
        allowed_weekdays: WeekdaySet,
        horizon: NaiveDateTime,
    ) -> Self {
        Self {
            daily_start,
            daily_end,
            lunch_start,
            lunch_duration: Duration::minutes(i64::from(lunch_duration_minutes)),
            allowed_weekdays,
            horizon,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(
            config.daily_start_time,
            config.daily_end_time,
            config.lunch_start_time,
            config.lunch_duration_minutes,
            config.allowed_weekdays.clone(),
            config.horizon(),
        )
    }

    pub fn horizon(&self) -> NaiveDateTime {
        self.horizon
    }

    pub fn daily_start(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.daily_start)
    }

    pub fn daily_end(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.daily_end)
    }

    /// 当日午休区间 [lunch_start, lunch_start + duration)
    pub fn lunch_window(&self, date: NaiveDate) -> TimeSlot {
        let start = date.and_time(self.lunch_start);
        TimeSlot::new(start, start + self.lunch_duration)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.allowed_weekdays.contains_date(date)
    }

    /// 下一自然日的开始时刻
    pub fn next_day_start(&self, current: NaiveDateTime) -> NaiveDateTime {
        let next = current.date().succ_opt().unwrap_or(current.date());
        self.daily_start(next)
    }

    /// [from, horizon) 内是否存在工作日
    pub fn has_working_day_before_horizon(&self, from: NaiveDate) -> bool {
        from.iter_days()
            .take_while(|d| self.daily_start(*d) < self.horizon)
            .any(|d| self.is_working_day(d))
    }

    /// 滚动到下一个工作日的可用时刻
    ///
    /// # 返回
    /// - Some(t): 当前时刻已在工作日内则原样返回，否则为下一个工作日的开始时刻
    /// - None: horizon 之前已无工作日
    pub fn advance_to_next_working_instant(&self, current: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut cursor = current;
        loop {
            if cursor >= self.horizon {
                return None;
            }
            if self.is_working_day(cursor.date()) {
                return Some(cursor);
            }
            let next = self.next_day_start(cursor);
            if next <= cursor {
                return None;
            }
            cursor = next;
        }
    }

    /// 从 current 起放置一个 duration_minutes 长的时段
    ///
    /// 1) current 落在午休内 → 移到午休结束
    /// 2) 时段跨越午休开始 → 移到午休结束并重算结束时间
    /// 3) 结束时间超过日终 → 顺延到下一日
    pub fn resolve_slot(&self, current: NaiveDateTime, duration_minutes: u32) -> SlotResolution {
        let duration = Duration::minutes(i64::from(duration_minutes));
        let date = current.date();
        let lunch = self.lunch_window(date);
        let day_end = self.daily_end(date);

        let mut start = current;
        if lunch.start <= start && start < lunch.end {
            start = lunch.end;
        }

        let mut end = start + duration;
        if start < lunch.start && lunch.start < end {
            start = lunch.end;
            end = start + duration;
        }

        if end > day_end {
            return SlotResolution::Rollover {
                next_day_start: self.next_day_start(current),
            };
        }

        SlotResolution::Placed(TimeSlot::new(start, end))
    }
}
