// ==========================================
// 系统初始化导入中心 - 模块注册快照仓储
// ==========================================
// 对齐: import_service_registry 表
// 用途: 运维排查时可直接查库看到当前进程注册了哪些模块
// ==========================================

use crate::domain::module::ModuleDescriptor;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct RegistrySnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RegistrySnapshotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 用当前注册表整体替换快照
    pub fn replace_all(
        &self,
        descriptors: &[ModuleDescriptor],
        registered_at: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM import_service_registry", [])?;

        for d in descriptors {
            tx.execute(
                r#"
                INSERT INTO import_service_registry (
                    module_name, domain, subdomain, display_name, description,
                    dependencies_json, priority, tags_json, supports_rollback, version,
                    columns_json, registered_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    d.module,
                    d.domain,
                    d.subdomain,
                    d.display_name,
                    d.description,
                    serde_json::to_string(&d.dependencies)?,
                    d.priority,
                    serde_json::to_string(&d.tags)?,
                    d.supports_rollback,
                    d.version,
                    serde_json::to_string(&d.columns)?,
                    registered_at,
                ],
            )?;
        }

        tx.commit()?;
        Ok(descriptors.len())
    }

    /// 快照中的模块名（按名称排序）
    pub fn list_module_names(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT module_name FROM import_service_registry ORDER BY module_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}
