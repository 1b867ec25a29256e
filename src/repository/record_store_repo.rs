// ==========================================
// 系统初始化导入中心 - 通用记录存储
// ==========================================
// 对齐: import_record 表，(module_name, record_key) 唯一
// job_id: 首次插入该记录的任务（回滚按此删除）
// updated_job_id: 最近一次覆盖写入的任务（update 策略）
// ==========================================

use crate::domain::module::ModuleDescriptor;
use crate::domain::session::ValidatedRow;
use crate::domain::types::ConflictPolicy;
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::record_sink::{BatchWriteOutcome, RecordSink};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Transaction};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录主键: key_column 的值；未配置主键列时按 job_id:行号 生成
    fn record_key(descriptor: &ModuleDescriptor, row: &ValidatedRow, job_id: &str) -> String {
        descriptor
            .key_column
            .as_ref()
            .and_then(|k| row.values.get(k))
            .cloned()
            .unwrap_or_else(|| format!("{}:{}", job_id, row.row_number))
    }

    /// 查询本批主键中已入库的部分
    fn existing_keys(
        tx: &Transaction,
        module_name: &str,
        keys: &[String],
    ) -> RepositoryResult<HashSet<String>> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT record_key FROM import_record WHERE module_name = ? AND record_key IN ({})",
            placeholders
        );
        let mut stmt = tx.prepare(&sql)?;
        let bind = std::iter::once(module_name).chain(keys.iter().map(|k| k.as_str()));
        let found = stmt
            .query_map(params_from_iter(bind), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(found)
    }

    /// 读取单条记录的任务归属（测试/排查用）
    pub fn find_owner(&self, module_name: &str, record_key: &str) -> RepositoryResult<Option<(String, Option<String>)>> {
        use rusqlite::OptionalExtension;
        let conn = self.get_conn()?;
        let owner = conn
            .query_row(
                "SELECT job_id, updated_job_id FROM import_record WHERE module_name = ? AND record_key = ?",
                params![module_name, record_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(owner)
    }
}

impl RecordSink for SqliteRecordStore {
    fn write_batch(
        &self,
        descriptor: &ModuleDescriptor,
        rows: &[ValidatedRow],
        job_id: &str,
        policy: ConflictPolicy,
        now: DateTime<Utc>,
    ) -> ImportResult<BatchWriteOutcome> {
        let module = descriptor.module.as_str();
        let keys: Vec<String> = rows
            .iter()
            .map(|r| Self::record_key(descriptor, r, job_id))
            .collect();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let existing = Self::existing_keys(&tx, module, &keys)?;

        if policy == ConflictPolicy::Error {
            if let Some(key_column) = descriptor.key_column.as_deref() {
                if let Some(conflict) = ConflictHandler
                    .detect_existing(rows, key_column, &existing)
                    .into_iter()
                    .next()
                {
                    return Err(ImportError::ConflictAbort {
                        row: conflict.row_number,
                        key: conflict.key,
                    });
                }
            }
        }

        let mut outcome = BatchWriteOutcome::default();
        let mut written: HashSet<&str> = HashSet::new();
        for (row, key) in rows.iter().zip(&keys) {
            let payload = serde_json::to_string(&row.values)
                .map_err(RepositoryError::from)?;
            let duplicate = existing.contains(key) || written.contains(key.as_str());

            if !duplicate {
                tx.execute(
                    r#"
                    INSERT INTO import_record (
                        module_name, record_key, job_id, updated_job_id, payload_json, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?5)
                    "#,
                    params![module, key, job_id, payload, now],
                )?;
                outcome.inserted += 1;
                written.insert(key.as_str());
                continue;
            }

            match policy {
                ConflictPolicy::Skip => outcome.skipped += 1,
                ConflictPolicy::Update => {
                    tx.execute(
                        r#"
                        UPDATE import_record
                        SET payload_json = ?1, updated_job_id = ?2, updated_at = ?3
                        WHERE module_name = ?4 AND record_key = ?5
                        "#,
                        params![payload, job_id, now, module, key],
                    )?;
                    outcome.updated += 1;
                }
                ConflictPolicy::Error => {
                    return Err(ImportError::ConflictAbort {
                        row: row.row_number,
                        key: key.clone(),
                    });
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn delete_by_job(&self, module_name: &str, job_id: &str) -> ImportResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM import_record WHERE module_name = ? AND job_id = ?",
            params![module_name, job_id],
        )?;
        Ok(deleted)
    }

    fn count_records(&self, module_name: &str) -> ImportResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM import_record WHERE module_name = ?",
            params![module_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
