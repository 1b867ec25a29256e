// ==========================================
// 系统初始化导入中心 - 模块运行态仓储
// ==========================================
// 对齐: module_runtime_status 表（每模块一行，按需创建）
// ==========================================

use crate::domain::module::ModuleRuntimeStatus;
use crate::domain::types::ModuleImportStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct ModuleStatusRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ModuleStatusRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取模块状态；无记录时返回 not_started
    pub fn get_or_default(&self, module_name: &str) -> RepositoryResult<ModuleRuntimeStatus> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT module_name, import_status, record_count, last_import_date, last_job_id
                FROM module_runtime_status
                WHERE module_name = ?
                "#,
                params![module_name],
                map_row,
            )
            .optional()?;

        match raw {
            Some(raw) => decode(raw),
            None => Ok(ModuleRuntimeStatus::not_started(module_name)),
        }
    }

    /// 全部已有状态（按模块名索引）
    pub fn find_all(&self) -> RepositoryResult<HashMap<String, ModuleRuntimeStatus>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT module_name, import_status, record_count, last_import_date, last_job_id
            FROM module_runtime_status
            "#,
        )?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|raw| decode(raw).map(|s| (s.module_name.clone(), s)))
            .collect()
    }

    /// 写入（UPSERT）
    pub fn upsert(&self, status: &ModuleRuntimeStatus, now: DateTime<Utc>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO module_runtime_status (
                module_name, import_status, record_count, last_import_date, last_job_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(module_name) DO UPDATE SET
                import_status = excluded.import_status,
                record_count = excluded.record_count,
                last_import_date = excluded.last_import_date,
                last_job_id = excluded.last_job_id,
                updated_at = excluded.updated_at
            "#,
            params![
                status.module_name,
                status.import_status.as_str(),
                status.record_count,
                status.last_import_date,
                status.last_job_id,
                now,
            ],
        )?;
        Ok(())
    }
}

fn map_row(row: &Row) -> SqliteResult<(ModuleRuntimeStatus, String)> {
    let status = ModuleRuntimeStatus {
        module_name: row.get(0)?,
        import_status: ModuleImportStatus::NotStarted,
        record_count: row.get(2)?,
        last_import_date: row.get(3)?,
        last_job_id: row.get(4)?,
    };
    Ok((status, row.get(1)?))
}

fn decode((mut status, raw): (ModuleRuntimeStatus, String)) -> RepositoryResult<ModuleRuntimeStatus> {
    status.import_status =
        ModuleImportStatus::from_str(&raw).ok_or_else(|| RepositoryError::FieldValueError {
            field: "import_status".to_string(),
            message: raw.clone(),
        })?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn setup_repo() -> ModuleStatusRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ModuleStatusRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_missing_row_reads_not_started() {
        let repo = setup_repo();
        let status = repo.get_or_default("drugs").unwrap();
        assert_eq!(status.import_status, ModuleImportStatus::NotStarted);
        assert_eq!(status.record_count, 0);
        assert!(repo.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_overwrites() {
        let repo = setup_repo();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let mut status = ModuleRuntimeStatus::not_started("drugs");
        status.import_status = ModuleImportStatus::InProgress;
        repo.upsert(&status, now).unwrap();

        status.import_status = ModuleImportStatus::Completed;
        status.record_count = 12;
        status.last_import_date = Some(now);
        status.last_job_id = Some("job-1".to_string());
        repo.upsert(&status, now).unwrap();

        let stored = repo.get_or_default("drugs").unwrap();
        assert_eq!(stored, status);
        assert_eq!(repo.find_all().unwrap().len(), 1);
    }
}
