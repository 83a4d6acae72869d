// ==========================================
// 培训中心排课系统 - 课表数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（冲突判定由 ConflictChecker 负责）
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::db::{format_datetime, open_sqlite_connection, parse_datetime_column};
use crate::domain::schedule::{NewScheduleEntry, ScheduleEntry, TimeSlot};
use crate::domain::types::SessionKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::schedule_store_trait::ScheduleStore;

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, site_id, student_id, student_name, machine_name, group_name,
        module_name, start_time, end_time, extra_time, session_type,
        capacity, notes, generation_run_id
    FROM schedule
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO schedule (
        site_id, student_id, student_name, machine_name, group_name,
        module_name, start_time, end_time, extra_time, session_type,
        capacity, notes, generation_run_id
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

// ==========================================
// ScheduleEntryRepository - 课表仓储
// ==========================================

/// 课表仓储
/// 职责: 管理 schedule 表的 CRUD 操作
pub struct ScheduleEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleEntryRepository {
    /// 创建新的课表仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    fn query_entries(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<ScheduleEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE {} ORDER BY start_time, id", SELECT_COLUMNS, where_clause);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params, map_row)?
            .collect::<Result<Vec<ScheduleEntry>, _>>()?;
        Ok(entries)
    }
}

impl ScheduleStore for ScheduleEntryRepository {
    fn insert(&self, entry: &NewScheduleEntry) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            INSERT_SQL,
            params![
                entry.tenant_id,
                entry.subject_id,
                entry.subject_name,
                entry.resource_name,
                entry.group_name,
                entry.module_name,
                format_datetime(&entry.start_time),
                format_datetime(&entry.end_time),
                entry.extra_time_minutes,
                entry.session_kind.as_str(),
                entry.capacity,
                entry.notes,
                entry.generation_run_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_batch(&self, entries: &[NewScheduleEntry]) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for entry in entries {
                stmt.execute(params![
                    entry.tenant_id,
                    entry.subject_id,
                    entry.subject_name,
                    entry.resource_name,
                    entry.group_name,
                    entry.module_name,
                    format_datetime(&entry.start_time),
                    format_datetime(&entry.end_time),
                    entry.extra_time_minutes,
                    entry.session_kind.as_str(),
                    entry.capacity,
                    entry.notes,
                    entry.generation_run_id,
                ])?;
            }
        }

        tx.commit()?;
        Ok(entries.len())
    }

    fn update(&self, entry: &ScheduleEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE schedule SET
                student_id = ?1, student_name = ?2, machine_name = ?3,
                group_name = ?4, module_name = ?5, start_time = ?6,
                end_time = ?7, extra_time = ?8, session_type = ?9,
                capacity = ?10, notes = ?11
            WHERE id = ?12 AND site_id = ?13
            "#,
            params![
                entry.subject_id,
                entry.subject_name,
                entry.resource_name,
                entry.group_name,
                entry.module_name,
                format_datetime(&entry.start_time),
                format_datetime(&entry.end_time),
                entry.extra_time_minutes,
                entry.session_kind.as_str(),
                entry.capacity,
                entry.notes,
                entry.id,
                entry.tenant_id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ScheduleEntry".to_string(),
                id: entry.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_by_id(&self, tenant_id: i64, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM schedule WHERE id = ?1 AND site_id = ?2",
            params![id, tenant_id],
        )?;
        Ok(affected > 0)
    }

    fn delete_all(&self, tenant_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM schedule WHERE site_id = ?1", params![tenant_id])?;
        Ok(affected)
    }

    fn find_by_id(&self, tenant_id: i64, id: i64) -> RepositoryResult<Option<ScheduleEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1 AND site_id = ?2", SELECT_COLUMNS);
        let entry = conn
            .query_row(&sql, params![id, tenant_id], map_row)
            .optional()?;
        Ok(entry)
    }

    fn find_overlapping(
        &self,
        tenant_id: i64,
        subject_name: &str,
        resource_name: &str,
        slot: &TimeSlot,
        exclude_id: Option<i64>,
    ) -> RepositoryResult<Vec<ScheduleEntry>> {
        let start = format_datetime(&slot.start);
        let end = format_datetime(&slot.end);
        // -1 不会与 AUTOINCREMENT 主键冲突
        let exclude = exclude_id.unwrap_or(-1);
        self.query_entries(
            r#"site_id = ?1
               AND student_name = ?2
               AND machine_name = ?3
               AND start_time < ?4
               AND end_time > ?5
               AND id != ?6"#,
            &[&tenant_id, &subject_name, &resource_name, &end, &start, &exclude],
        )
    }

    fn find_by_time_range(&self, tenant_id: i64, range: &TimeSlot) -> RepositoryResult<Vec<ScheduleEntry>> {
        let start = format_datetime(&range.start);
        let end = format_datetime(&range.end);
        self.query_entries(
            "site_id = ?1 AND start_time < ?2 AND end_time > ?3",
            &[&tenant_id, &end, &start],
        )
    }

    fn find_starting_on(&self, tenant_id: i64, date: NaiveDate) -> RepositoryResult<Vec<ScheduleEntry>> {
        let day_start = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            RepositoryError::InternalError(format!("无法构造日期起点: {}", date))
        })?;
        let next_day = date.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)).ok_or_else(|| {
            RepositoryError::InternalError(format!("日期越界: {}", date))
        })?;
        let from = format_datetime(&day_start);
        let to = format_datetime(&next_day);
        self.query_entries(
            "site_id = ?1 AND start_time >= ?2 AND start_time < ?3",
            &[&tenant_id, &from, &to],
        )
    }

    fn find_by_subject(&self, tenant_id: i64, subject_name: &str) -> RepositoryResult<Vec<ScheduleEntry>> {
        self.query_entries("site_id = ?1 AND student_name = ?2", &[&tenant_id, &subject_name])
    }

    fn find_by_resource(&self, tenant_id: i64, resource_name: &str) -> RepositoryResult<Vec<ScheduleEntry>> {
        self.query_entries("site_id = ?1 AND machine_name = ?2", &[&tenant_id, &resource_name])
    }

    fn list_all(&self, tenant_id: i64) -> RepositoryResult<Vec<ScheduleEntry>> {
        self.query_entries("site_id = ?1", &[&tenant_id])
    }

    fn count(&self, tenant_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM schedule WHERE site_id = ?1",
            params![tenant_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// 映射数据库行到 ScheduleEntry
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ScheduleEntry> {
    let session_raw: String = row.get(10)?;
    let session_kind = session_raw.parse::<SessionKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    Ok(ScheduleEntry {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        subject_id: row.get(2)?,
        subject_name: row.get(3)?,
        resource_name: row.get(4)?,
        group_name: row.get(5)?,
        module_name: row.get(6)?,
        start_time: parse_datetime_column(7, &row.get::<_, String>(7)?)?,
        end_time: parse_datetime_column(8, &row.get::<_, String>(8)?)?,
        extra_time_minutes: row.get(9)?,
        session_kind,
        capacity: row.get(11)?,
        notes: row.get(12)?,
        generation_run_id: row.get(13)?,
    })
}
