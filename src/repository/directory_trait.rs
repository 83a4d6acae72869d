// ==========================================
// 培训中心排课系统 - 名录读取接口
// ==========================================
// 职责: 学员/班组/机台/模块只读查询
// 说明: 按姓名/班组名的匹配只发生在本接口边界，
//       排课引擎内部只使用学员ID
// ==========================================

use crate::domain::directory::{Machine, Module, Student};
use crate::repository::error::RepositoryResult;

/// 名录读取接口
///
/// 返回的学员列表按ID升序，机台列表按ID升序（轮转分配依赖该顺序）。
pub trait Directory {
    fn list_students(&self, tenant_id: i64) -> RepositoryResult<Vec<Student>>;

    fn find_students_by_ids(&self, tenant_id: i64, ids: &[i64]) -> RepositoryResult<Vec<Student>>;

    fn find_students_by_group_ids(&self, tenant_id: i64, group_ids: &[i64]) -> RepositoryResult<Vec<Student>>;

    /// 查询选修了指定模块的学员（student_module_progress）
    fn find_students_by_module_ids(&self, tenant_id: i64, module_ids: &[i64]) -> RepositoryResult<Vec<Student>>;

    /// 按班组名称展开成员
    fn find_students_by_group_name(&self, tenant_id: i64, group_name: &str) -> RepositoryResult<Vec<Student>>;

    /// 按姓名查找学员（同名时取ID最小者）
    fn find_student_by_name(&self, tenant_id: i64, student_name: &str) -> RepositoryResult<Option<Student>>;

    fn find_modules_by_ids(&self, tenant_id: i64, ids: &[i64]) -> RepositoryResult<Vec<Module>>;

    fn list_machines(&self, tenant_id: i64) -> RepositoryResult<Vec<Machine>>;

    fn find_machines_by_ids(&self, tenant_id: i64, ids: &[i64]) -> RepositoryResult<Vec<Machine>>;
}
