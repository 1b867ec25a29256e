// ==========================================
// 系统初始化导入中心 - 校验会话仓储
// ==========================================
// 对齐: import_session 表
// 消费一次: UPDATE ... WHERE consumed_at IS NULL，按影响行数判断是否抢占成功
// ==========================================

use crate::domain::session::{ValidationSession, ValidationStats};
use crate::domain::types::FileType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct ImportSessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportSessionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存新会话
    pub fn insert(&self, session: &ValidationSession) -> RepositoryResult<()> {
        let rows_json = serde_json::to_string(&session.rows)?;
        let errors_json = serde_json::to_string(&session.errors)?;
        let warnings_json = serde_json::to_string(&session.warnings)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_session (
                session_id, module_name, file_name, file_type, file_size_bytes,
                rows_json, errors_json, warnings_json,
                total_rows, valid_rows, error_rows, can_proceed,
                created_by, created_at, expires_at, consumed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                session.session_id,
                session.module_name,
                session.file_name,
                session.file_type.as_str(),
                session.file_size_bytes,
                rows_json,
                errors_json,
                warnings_json,
                session.stats.total_rows,
                session.stats.valid_rows,
                session.stats.error_rows,
                session.can_proceed,
                session.created_by,
                session.created_at,
                session.expires_at,
                session.consumed_at,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 读取（不区分是否已消费/过期，由调用方判断）
    pub fn find_by_id(&self, session_id: &str) -> RepositoryResult<Option<ValidationSession>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT session_id, module_name, file_name, file_type, file_size_bytes,
                       rows_json, errors_json, warnings_json,
                       total_rows, valid_rows, error_rows, can_proceed,
                       created_by, created_at, expires_at, consumed_at
                FROM import_session
                WHERE session_id = ?
                "#,
                params![session_id],
                SessionRow::from_row,
            )
            .optional()?;
        drop(conn);

        raw.map(SessionRow::into_session).transpose()
    }

    /// 抢占会话（只会成功一次）
    ///
    /// # 返回
    /// - true: 本次调用消费成功
    /// - false: 不存在或已被消费
    pub fn consume(&self, session_id: &str, now: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE import_session SET consumed_at = ?1 WHERE session_id = ?2 AND consumed_at IS NULL",
            params![now, session_id],
        )?;
        Ok(changed == 1)
    }

    /// 清理已过期会话，返回清理数量
    pub fn purge_expired(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM import_session WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(removed)
    }
}

// 行映射中间结构（JSON 解码放在锁外）
struct SessionRow {
    session_id: String,
    module_name: String,
    file_name: String,
    file_type: String,
    file_size_bytes: usize,
    rows_json: String,
    errors_json: String,
    warnings_json: String,
    stats: ValidationStats,
    can_proceed: bool,
    created_by: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            module_name: row.get(1)?,
            file_name: row.get(2)?,
            file_type: row.get(3)?,
            file_size_bytes: row.get(4)?,
            rows_json: row.get(5)?,
            errors_json: row.get(6)?,
            warnings_json: row.get(7)?,
            stats: ValidationStats {
                total_rows: row.get(8)?,
                valid_rows: row.get(9)?,
                error_rows: row.get(10)?,
            },
            can_proceed: row.get(11)?,
            created_by: row.get(12)?,
            created_at: row.get(13)?,
            expires_at: row.get(14)?,
            consumed_at: row.get(15)?,
        })
    }

    fn into_session(self) -> RepositoryResult<ValidationSession> {
        let file_type =
            FileType::from_str(&self.file_type).ok_or_else(|| RepositoryError::FieldValueError {
                field: "file_type".to_string(),
                message: self.file_type.clone(),
            })?;
        Ok(ValidationSession {
            session_id: self.session_id,
            module_name: self.module_name,
            file_name: self.file_name,
            file_type,
            file_size_bytes: self.file_size_bytes,
            rows: serde_json::from_str(&self.rows_json)?,
            errors: serde_json::from_str(&self.errors_json)?,
            warnings: serde_json::from_str(&self.warnings_json)?,
            stats: self.stats,
            can_proceed: self.can_proceed,
            created_by: self.created_by,
            created_at: self.created_at,
            expires_at: self.expires_at,
            consumed_at: self.consumed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{ValidatedRow, ValidationMessage};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn setup_repo() -> ImportSessionRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ImportSessionRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
    }

    fn session(id: &str) -> ValidationSession {
        let mut values = BTreeMap::new();
        values.insert("drug_code".to_string(), "D-1".to_string());
        ValidationSession {
            session_id: id.to_string(),
            module_name: "drugs".to_string(),
            file_name: "drugs.csv".to_string(),
            file_type: FileType::Csv,
            file_size_bytes: 42,
            rows: vec![ValidatedRow {
                row_number: 1,
                values,
            }],
            errors: vec![],
            warnings: vec![ValidationMessage::warning(
                1,
                "unit",
                "DEPRECATED_VALUE",
                "deprecated".to_string(),
            )],
            stats: ValidationStats {
                total_rows: 1,
                valid_rows: 1,
                error_rows: 0,
            },
            can_proceed: false,
            created_by: "u1".to_string(),
            created_at: t0(),
            expires_at: t0() + Duration::minutes(30),
            consumed_at: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup_repo();
        repo.insert(&session("s-1")).unwrap();

        let found = repo.find_by_id("s-1").unwrap().unwrap();
        assert_eq!(found.rows.len(), 1);
        assert_eq!(found.warnings[0].code, "DEPRECATED_VALUE");
        assert_eq!(found.expires_at, t0() + Duration::minutes(30));
        assert!(repo.find_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_consume_only_once() {
        let repo = setup_repo();
        repo.insert(&session("s-1")).unwrap();

        assert!(repo.consume("s-1", t0()).unwrap());
        assert!(!repo.consume("s-1", t0()).unwrap());
        assert!(!repo.consume("missing", t0()).unwrap());
        assert_eq!(repo.find_by_id("s-1").unwrap().unwrap().consumed_at, Some(t0()));
    }

    #[test]
    fn test_purge_expired() {
        let repo = setup_repo();
        repo.insert(&session("old")).unwrap();
        let mut fresh = session("fresh");
        fresh.expires_at = t0() + Duration::hours(2);
        repo.insert(&fresh).unwrap();

        let removed = repo.purge_expired(t0() + Duration::hours(1)).unwrap();
        assert_eq!(removed, 1);
        assert!(repo.find_by_id("old").unwrap().is_none());
        assert!(repo.find_by_id("fresh").unwrap().is_some());
    }
}
