// ==========================================
// 培训中心排课系统 - 名录领域模型
// ==========================================
// 职责: 学员、班组、机台、模块（排课引擎只读）
// 说明: 名录维护（增删改表单）不在本系统范围内
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Student - 学员
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,                        // 学员ID (稳定标识)
    pub tenant_id: i64,                 // 所属站点
    pub student_number: Option<String>, // 学号，例如 AGP24101
    pub student_name: String,           // 姓名
    pub group_id: Option<i64>,          // 所属班组
    pub group_name: Option<String>,     // 班组名称 (联表补充)
}

// ==========================================
// Group - 班组
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
}

// ==========================================
// Machine - 机台（排课资源）
// ==========================================
// 分配方式: 在筛选后的机台列表上轮转，不做能力等级匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub tenant_id: i64,
    pub machine_name: String,
    pub level: String, // 能力等级
}

// ==========================================
// Module - 培训模块
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub code: Option<String>,
}
