use super::core::ImportJobRepository;
use crate::domain::job::{ImportJob, ImportedBy, JobProgress};
use crate::domain::types::JobStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT job_id, module_name, session_id, file_name, status,
           total_rows, imported_rows, error_rows, skipped_rows, current_row, percent_complete,
           options_json, batch_size, started_at, completed_at, error_message,
           imported_by, imported_by_name, ip_address, user_agent,
           rolled_back_at, rolled_back_by, deleted_records
    FROM import_job
"#;

impl ImportJobRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE job_id = ?", SELECT_COLUMNS))?;
        let raw = stmt
            .query_row(params![job_id], |row| Self::map_row(row))
            .optional()?;
        raw.map(Self::decode).transpose()
    }

    /// 指定模块最近的任务（开始时间倒序）
    pub fn find_by_module(&self, module_name: &str, limit: usize) -> RepositoryResult<Vec<ImportJob>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE module_name = ? ORDER BY started_at DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;
        let raws = stmt
            .query_map(params![module_name, limit], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        raws.into_iter().map(Self::decode).collect()
    }

    /// 按状态统计任务数
    pub fn count_by_status(&self, status: JobStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM import_job WHERE status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn map_row(row: &Row) -> SqliteResult<(ImportJob, String, String)> {
        let job = ImportJob {
            job_id: row.get(0)?,
            module_name: row.get(1)?,
            session_id: row.get(2)?,
            file_name: row.get(3)?,
            status: JobStatus::Pending,
            progress: JobProgress {
                total_rows: row.get(5)?,
                imported_rows: row.get(6)?,
                error_rows: row.get(7)?,
                skipped_rows: row.get(8)?,
                current_row: row.get(9)?,
                percent_complete: row.get(10)?,
            },
            options: Default::default(),
            batch_size: row.get(12)?,
            started_at: row.get(13)?,
            completed_at: row.get(14)?,
            error: row.get(15)?,
            imported_by: ImportedBy {
                id: row.get(16)?,
                name: row.get(17)?,
            },
            ip_address: row.get(18)?,
            user_agent: row.get(19)?,
            rolled_back_at: row.get(20)?,
            rolled_back_by: row.get(21)?,
            deleted_records: row.get(22)?,
        };
        Ok((job, row.get(4)?, row.get(11)?))
    }

    /// 解码状态与选项 JSON
    fn decode((mut job, status, options_json): (ImportJob, String, String)) -> RepositoryResult<ImportJob> {
        job.status = JobStatus::from_str(&status).ok_or_else(|| RepositoryError::FieldValueError {
            field: "status".to_string(),
            message: status.clone(),
        })?;
        job.options = serde_json::from_str(&options_json)?;
        Ok(job)
    }
}
