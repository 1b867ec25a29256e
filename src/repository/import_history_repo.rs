// ==========================================
// 系统初始化导入中心 - 导入历史仓储
// ==========================================
// 对齐: import_history 表（追加写，只读查询）
// ==========================================

use crate::domain::job::{ImportHistoryRecord, ImportedBy};
use crate::domain::types::JobStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct ImportHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportHistoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条历史
    pub fn append(&self, record: &ImportHistoryRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_history (
                job_id, module_name, status, records_imported,
                completed_at, imported_by, imported_by_name
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.job_id,
                record.module,
                record.status.as_str(),
                record.records_imported,
                record.completed_at,
                record.imported_by.id,
                record.imported_by.name,
            ],
        )?;
        Ok(())
    }

    /// 最近 N 条（全部模块，完成时间倒序）
    pub fn find_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportHistoryRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT job_id, module_name, status, records_imported,
                   completed_at, imported_by, imported_by_name
            FROM import_history
            ORDER BY completed_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        rows.into_iter().map(decode).collect()
    }

    /// 指定模块最近 N 条
    pub fn find_by_module(&self, module_name: &str, limit: usize) -> RepositoryResult<Vec<ImportHistoryRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT job_id, module_name, status, records_imported,
                   completed_at, imported_by, imported_by_name
            FROM import_history
            WHERE module_name = ?
            ORDER BY completed_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let rows = stmt
            .query_map(params![module_name, limit], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        rows.into_iter().map(decode).collect()
    }
}

fn map_row(row: &Row) -> SqliteResult<(ImportHistoryRecord, String)> {
    let record = ImportHistoryRecord {
        job_id: row.get(0)?,
        module: row.get(1)?,
        status: JobStatus::Completed,
        records_imported: row.get(3)?,
        completed_at: row.get(4)?,
        imported_by: ImportedBy {
            id: row.get(5)?,
            name: row.get(6)?,
        },
    };
    Ok((record, row.get(2)?))
}

fn decode((mut record, status): (ImportHistoryRecord, String)) -> RepositoryResult<ImportHistoryRecord> {
    record.status = JobStatus::from_str(&status).ok_or_else(|| RepositoryError::FieldValueError {
        field: "status".to_string(),
        message: status.clone(),
    })?;
    Ok(record)
}
