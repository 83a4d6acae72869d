// ==========================================
// 培训中心排课系统 - 名录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 写入方法仅供种子数据/测试使用，名录维护界面不在范围内
// ==========================================

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::db::open_sqlite_connection;
use crate::domain::directory::{Machine, Module, Student};
use crate::repository::directory_trait::Directory;
use crate::repository::error::{RepositoryError, RepositoryResult};

const STUDENT_COLUMNS: &str = r#"
    SELECT s.id, s.site_id, s.student_number, s.student_name, s.group_id, g.name
    FROM students s
    LEFT JOIN student_groups g ON g.id = s.group_id
"#;

// ==========================================
// DirectoryRepository - 名录仓储
// ==========================================
pub struct DirectoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DirectoryRepository {
    /// 创建新的名录仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_students(&self, where_clause: &str, values: Vec<Value>) -> RepositoryResult<Vec<Student>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE {} ORDER BY s.id", STUDENT_COLUMNS, where_clause);
        let mut stmt = conn.prepare(&sql)?;
        let students = stmt
            .query_map(params_from_iter(values), map_student_row)?
            .collect::<Result<Vec<Student>, _>>()?;
        Ok(students)
    }

    // ==========================================
    // 写入（种子数据/测试）
    // ==========================================

    pub fn insert_site(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO sites (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_group(&self, tenant_id: i64, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO student_groups (site_id, name) VALUES (?1, ?2)",
            params![tenant_id, name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_student(
        &self,
        tenant_id: i64,
        student_number: Option<&str>,
        student_name: &str,
        group_id: Option<i64>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO students (site_id, student_number, student_name, group_id) VALUES (?1, ?2, ?3, ?4)",
            params![tenant_id, student_number, student_name, group_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_machine(&self, tenant_id: i64, machine_name: &str, level: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO machines (site_id, machine_name, level) VALUES (?1, ?2, ?3)",
            params![tenant_id, machine_name, level],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_module(&self, tenant_id: i64, name: &str, code: Option<&str>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO modules (site_id, name, code) VALUES (?1, ?2, ?3)",
            params![tenant_id, name, code],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 登记学员模块进度（幂等）
    pub fn enroll_student(&self, student_id: i64, module_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO student_module_progress (student_id, module_id) VALUES (?1, ?2)",
            params![student_id, module_id],
        )?;
        Ok(())
    }
}

impl Directory for DirectoryRepository {
    fn list_students(&self, tenant_id: i64) -> RepositoryResult<Vec<Student>> {
        self.query_students("s.site_id = ?", vec![Value::Integer(tenant_id)])
    }

    fn find_students_by_ids(&self, tenant_id: i64, ids: &[i64]) -> RepositoryResult<Vec<Student>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let where_clause = format!("s.site_id = ? AND s.id IN ({})", placeholders(ids.len()));
        self.query_students(&where_clause, tenant_and_ids(tenant_id, ids))
    }

    fn find_students_by_group_ids(&self, tenant_id: i64, group_ids: &[i64]) -> RepositoryResult<Vec<Student>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let where_clause = format!("s.site_id = ? AND s.group_id IN ({})", placeholders(group_ids.len()));
        self.query_students(&where_clause, tenant_and_ids(tenant_id, group_ids))
    }

    fn find_students_by_module_ids(&self, tenant_id: i64, module_ids: &[i64]) -> RepositoryResult<Vec<Student>> {
        if module_ids.is_empty() {
            return Ok(Vec::new());
        }
        let where_clause = format!(
            "s.site_id = ? AND s.id IN (SELECT p.student_id FROM student_module_progress p WHERE p.module_id IN ({}))",
            placeholders(module_ids.len())
        );
        self.query_students(&where_clause, tenant_and_ids(tenant_id, module_ids))
    }

    fn find_students_by_group_name(&self, tenant_id: i64, group_name: &str) -> RepositoryResult<Vec<Student>> {
        self.query_students(
            "s.site_id = ? AND g.name = ?",
            vec![Value::Integer(tenant_id), Value::Text(group_name.to_string())],
        )
    }

    fn find_student_by_name(&self, tenant_id: i64, student_name: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE s.site_id = ?1 AND s.student_name = ?2 ORDER BY s.id LIMIT 1",
            STUDENT_COLUMNS
        );
        let student = conn
            .query_row(&sql, params![tenant_id, student_name], map_student_row)
            .optional()?;
        Ok(student)
    }

    fn find_modules_by_ids(&self, tenant_id: i64, ids: &[i64]) -> RepositoryResult<Vec<Module>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, site_id, name, code FROM modules WHERE site_id = ? AND id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let modules = stmt
            .query_map(params_from_iter(tenant_and_ids(tenant_id, ids)), |row| {
                Ok(Module {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    name: row.get(2)?,
                    code: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<Module>, _>>()?;
        Ok(modules)
    }

    fn list_machines(&self, tenant_id: i64) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, site_id, machine_name, level FROM machines WHERE site_id = ?1 ORDER BY id",
        )?;
        let machines = stmt
            .query_map(params![tenant_id], map_machine_row)?
            .collect::<Result<Vec<Machine>, _>>()?;
        Ok(machines)
    }

    fn find_machines_by_ids(&self, tenant_id: i64, ids: &[i64]) -> RepositoryResult<Vec<Machine>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, site_id, machine_name, level FROM machines WHERE site_id = ? AND id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let machines = stmt
            .query_map(params_from_iter(tenant_and_ids(tenant_id, ids)), map_machine_row)?
            .collect::<Result<Vec<Machine>, _>>()?;
        Ok(machines)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn tenant_and_ids(tenant_id: i64, ids: &[i64]) -> Vec<Value> {
    std::iter::once(Value::Integer(tenant_id))
        .chain(ids.iter().map(|id| Value::Integer(*id)))
        .collect()
}

fn map_student_row(row: &rusqlite::Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        student_number: row.get(2)?,
        student_name: row.get(3)?,
        group_id: row.get(4)?,
        group_name: row.get(5)?,
    })
}

fn map_machine_row(row: &rusqlite::Row) -> rusqlite::Result<Machine> {
    Ok(Machine {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        machine_name: row.get(2)?,
        level: row.get(3)?,
    })
}
