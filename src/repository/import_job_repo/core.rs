use crate::domain::job::{ImportJob, JobProgress};
use crate::domain::types::JobStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ImportJobRepository - 导入任务仓储
// ==========================================
pub struct ImportJobRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportJobRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 新建任务
    pub fn insert(&self, job: &ImportJob) -> RepositoryResult<()> {
        let options_json = serde_json::to_string(&job.options)?;
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO import_job (
                job_id, module_name, session_id, file_name, status,
                total_rows, imported_rows, error_rows, skipped_rows, current_row, percent_complete,
                options_json, batch_size, started_at, completed_at, error_message,
                imported_by, imported_by_name, ip_address, user_agent,
                rolled_back_at, rolled_back_by, deleted_records
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                job.job_id,
                job.module_name,
                job.session_id,
                job.file_name,
                job.status.as_str(),
                job.progress.total_rows,
                job.progress.imported_rows,
                job.progress.error_rows,
                job.progress.skipped_rows,
                job.progress.current_row,
                job.progress.percent_complete,
                options_json,
                job.batch_size,
                job.started_at,
                job.completed_at,
                job.error,
                job.imported_by.id,
                job.imported_by.name,
                job.ip_address,
                job.user_agent,
                job.rolled_back_at,
                job.rolled_back_by,
                job.deleted_records,
            ],
        )?;
        Ok(())
    }

    /// 更新进度（仅 running 状态可写）
    pub fn update_progress(&self, job_id: &str, progress: &JobProgress) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"
            UPDATE import_job
            SET total_rows = ?, imported_rows = ?, error_rows = ?, skipped_rows = ?,
                current_row = ?, percent_complete = ?
            WHERE job_id = ? AND status = 'running'
            "#,
            params![
                progress.total_rows,
                progress.imported_rows,
                progress.error_rows,
                progress.skipped_rows,
                progress.current_row,
                progress.percent_complete,
                job_id,
            ],
        )?;
        if changed == 0 {
            return Err(self.explain_miss(&conn, job_id, JobStatus::Running)?);
        }
        Ok(())
    }

    /// pending -> running
    pub fn mark_running(&self, job_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::check_transition(JobStatus::Pending, JobStatus::Running)?;
        let changed = conn.execute(
            "UPDATE import_job SET status = 'running' WHERE job_id = ? AND status = 'pending'",
            params![job_id],
        )?;
        if changed == 0 {
            return Err(self.explain_miss(&conn, job_id, JobStatus::Running)?);
        }
        Ok(())
    }

    /// 进入终态 completed / failed
    pub fn finish(
        &self,
        job_id: &str,
        from: JobStatus,
        to: JobStatus,
        at: DateTime<Utc>,
        error: Option<&str>,
    ) -> RepositoryResult<()> {
        Self::check_transition(from, to)?;
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"
            UPDATE import_job
            SET status = ?, completed_at = ?, error_message = ?
            WHERE job_id = ? AND status = ?
            "#,
            params![to.as_str(), at, error, job_id, from.as_str()],
        )?;
        if changed == 0 {
            return Err(self.explain_miss(&conn, job_id, to)?);
        }
        Ok(())
    }

    /// completed -> rolled_back，同一事务内删除该任务新增的记录
    ///
    /// # 返回
    /// - 删除的记录数；状态不符时整个事务回滚，记录保持不变
    pub fn rollback_completed(
        &self,
        job_id: &str,
        module_name: &str,
        at: DateTime<Utc>,
        by: &str,
    ) -> RepositoryResult<usize> {
        Self::check_transition(JobStatus::Completed, JobStatus::RolledBack)?;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM import_record WHERE module_name = ? AND job_id = ?",
            params![module_name, job_id],
        )?;
        let changed = tx.execute(
            r#"
            UPDATE import_job
            SET status = 'rolled_back', rolled_back_at = ?, rolled_back_by = ?, deleted_records = ?
            WHERE job_id = ? AND status = 'completed'
            "#,
            params![at, by, deleted, job_id],
        )?;
        if changed == 0 {
            return Err(self.explain_miss(&tx, job_id, JobStatus::RolledBack)?);
        }

        tx.commit()?;
        Ok(deleted)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn check_transition(from: JobStatus, to: JobStatus) -> RepositoryResult<()> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(RepositoryError::InvalidStateTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// CAS 未命中: 任务不存在 -> NotFound；状态已变 -> InvalidStateTransition
    fn explain_miss(
        &self,
        conn: &Connection,
        job_id: &str,
        to: JobStatus,
    ) -> RepositoryResult<RepositoryError> {
        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM import_job WHERE job_id = ?",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match current {
            None => RepositoryError::NotFound {
                entity: "ImportJob".to_string(),
                id: job_id.to_string(),
            },
            Some(status) => RepositoryError::InvalidStateTransition {
                from: status,
                to: to.as_str().to_string(),
            },
        })
    }
}
