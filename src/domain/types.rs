// ==========================================
// 培训中心排课系统 - 领域类型定义
// ==========================================
// 职责: 课程类型、优先级规则、生成范围、工作日白名单
// 约定: 序列化格式与数据库/表单取值保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};

// ==========================================
// 课程类型 (Session Kind)
// ==========================================
// 序列化格式: snake_case (与 schedule.session_type 列一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    #[default]
    Practical,     // 实操课
    PracticalTest, // 实操考试
    WrittenTest,   // 笔试
}

impl SessionKind {
    /// 是否为考试类课程（考试类允许多名学员共享一个时段）
    pub fn is_test(&self) -> bool {
        matches!(self, SessionKind::PracticalTest | SessionKind::WrittenTest)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Practical => "practical",
            SessionKind::PracticalTest => "practical_test",
            SessionKind::WrittenTest => "written_test",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "practical" => Ok(SessionKind::Practical),
            "practical_test" => Ok(SessionKind::PracticalTest),
            "written_test" => Ok(SessionKind::WrittenTest),
            other => Err(format!("未知的课程类型: {}", other)),
        }
    }
}

// ==========================================
// 优先级规则 (Priority Rule)
// ==========================================
// FIFO: 按插入顺序
// SPT:  最短加工时间优先
// LPT:  最长加工时间优先
// GROUP / MODULE: 按班组名 / 模块名升序，缺失值排在最后
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityRule {
    #[default]
    Fifo,
    Spt,
    Lpt,
    Group,
    Module,
}

impl PriorityRule {
    /// 基础排课入口只支持三种规则
    pub fn is_basic(&self) -> bool {
        matches!(self, PriorityRule::Fifo | PriorityRule::Spt | PriorityRule::Lpt)
    }
}

impl fmt::Display for PriorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityRule::Fifo => write!(f, "FIFO"),
            PriorityRule::Spt => write!(f, "SPT"),
            PriorityRule::Lpt => write!(f, "LPT"),
            PriorityRule::Group => write!(f, "GROUP"),
            PriorityRule::Module => write!(f, "MODULE"),
        }
    }
}

impl FromStr for PriorityRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FIFO" => Ok(PriorityRule::Fifo),
            "SPT" => Ok(PriorityRule::Spt),
            "LPT" => Ok(PriorityRule::Lpt),
            "GROUP" => Ok(PriorityRule::Group),
            "MODULE" => Ok(PriorityRule::Module),
            other => Err(format!("未知的优先级规则: {}", other)),
        }
    }
}

// ==========================================
// 生成范围 (Generation Scope)
// ==========================================
// 仅用于记录与展示，实际筛选由 SubjectFilter 决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationScope {
    #[default]
    All,
    Group,
    Module,
    Custom,
}

impl fmt::Display for GenerationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationScope::All => write!(f, "all"),
            GenerationScope::Group => write!(f, "group"),
            GenerationScope::Module => write!(f, "module"),
            GenerationScope::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for GenerationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(GenerationScope::All),
            "group" | "groups" => Ok(GenerationScope::Group),
            "module" | "modules" => Ok(GenerationScope::Module),
            "custom" | "students" => Ok(GenerationScope::Custom),
            other => Err(format!("未知的生成范围: {}", other)),
        }
    }
}

// ==========================================
// 工作日白名单 (Weekday Set)
// ==========================================
// 编号: 0=周一 ... 6=周日
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdaySet(BTreeSet<u8>);

impl WeekdaySet {
    /// 由编号列表构造，编号超出 0..=6 时返回 Err(非法编号)
    pub fn from_indices<I: IntoIterator<Item = u8>>(indices: I) -> Result<Self, u8> {
        let mut days = BTreeSet::new();
        for day in indices {
            if day > 6 {
                return Err(day);
            }
            days.insert(day);
        }
        Ok(Self(days))
    }

    /// 周一至周五
    pub fn weekdays() -> Self {
        Self((0..=4).collect())
    }

    /// 全周
    pub fn all_days() -> Self {
        Self((0..=6).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0.contains(&(weekday.num_days_from_monday() as u8))
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl Default for WeekdaySet {
    fn default() -> Self {
        Self::weekdays()
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for WeekdaySet {
    type Err = String;

    /// 解析逗号分隔的编号列表，例如 "0,1,2,3,4"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut indices = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day: u8 = part
                .parse()
                .map_err(|_| format!("工作日编号格式错误: {}", part))?;
            indices.push(day);
        }
        WeekdaySet::from_indices(indices).map_err(|d| format!("工作日编号超出范围(0-6): {}", d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_kind_roundtrip_and_test_flag() {
        assert_eq!("written_test".parse::<SessionKind>().unwrap(), SessionKind::WrittenTest);
        assert!(SessionKind::PracticalTest.is_test());
        assert!(!SessionKind::Practical.is_test());
        assert!("exam".parse::<SessionKind>().is_err());
    }

    #[test]
    fn test_priority_rule_parse_is_case_insensitive() {
        assert_eq!("spt".parse::<PriorityRule>().unwrap(), PriorityRule::Spt);
        assert_eq!("MODULE".parse::<PriorityRule>().unwrap(), PriorityRule::Module);
        assert!("EDD".parse::<PriorityRule>().is_err());
        assert!(!PriorityRule::Group.is_basic());
    }

    #[test]
    fn test_weekday_set() {
        let set: WeekdaySet = "0, 2,4".parse().unwrap();
        assert!(set.contains(Weekday::Mon));
        assert!(!set.contains(Weekday::Tue));
        assert!(set.contains(Weekday::Fri));
        assert_eq!(set.to_string(), "0,2,4");

        assert!("7".parse::<WeekdaySet>().is_err());
        assert!(WeekdaySet::from_indices(vec![9]).is_err());

        // 2024-03-04 为周一
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(WeekdaySet::weekdays().contains_date(monday));
        assert!(!WeekdaySet::weekdays().contains_date(monday + chrono::Days::new(5)));
    }
}
