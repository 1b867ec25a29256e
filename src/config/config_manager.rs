// ==========================================
// 系统初始化导入中心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::import_settings::{
    ExecutionMode, DEFAULT_BATCH_SIZE, DEFAULT_LOCALE, DEFAULT_MAX_FILE_SIZE_BYTES,
    DEFAULT_MAX_ROWS, DEFAULT_SESSION_TTL_MINUTES,
};
use crate::db::open_sqlite_connection;
use crate::domain::job::{MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置（按 key 排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数配置；非法/越界值回落到默认值并告警
    fn get_usize_or_default(
        &self,
        key: &str,
        default: usize,
        bounds: (usize, usize),
    ) -> RepositoryResult<usize> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        match raw.trim().parse::<usize>() {
            Ok(v) if v >= bounds.0 && v <= bounds.1 => Ok(v),
            _ => {
                tracing::warn!(key, value = %raw, default, "配置值无效，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_file_size_bytes(&self) -> RepositoryResult<usize> {
        self.get_usize_or_default(
            config_keys::MAX_FILE_SIZE_BYTES,
            DEFAULT_MAX_FILE_SIZE_BYTES,
            (1, usize::MAX),
        )
    }

    async fn get_max_rows(&self) -> RepositoryResult<usize> {
        self.get_usize_or_default(config_keys::MAX_ROWS, DEFAULT_MAX_ROWS, (1, usize::MAX))
    }

    async fn get_session_ttl_minutes(&self) -> RepositoryResult<i64> {
        let value = self.get_config_or_default(
            config_keys::SESSION_TTL_MINUTES,
            &DEFAULT_SESSION_TTL_MINUTES.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_MINUTES))
    }

    async fn get_default_batch_size(&self) -> RepositoryResult<usize> {
        self.get_usize_or_default(
            config_keys::DEFAULT_BATCH_SIZE,
            DEFAULT_BATCH_SIZE,
            (MIN_BATCH_SIZE, MAX_BATCH_SIZE),
        )
    }

    async fn get_execution_mode(&self) -> RepositoryResult<ExecutionMode> {
        let value = self.get_config_or_default(config_keys::EXECUTION_MODE, "inline")?;
        Ok(ExecutionMode::from_str(&value).unwrap_or_default())
    }

    async fn get_locale(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::LOCALE, DEFAULT_LOCALE)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 上传限制
    pub const MAX_FILE_SIZE_BYTES: &str = "import.max_file_size_bytes";
    pub const MAX_ROWS: &str = "import.max_rows";

    // 会话
    pub const SESSION_TTL_MINUTES: &str = "import.session_ttl_minutes";

    // 执行
    pub const DEFAULT_BATCH_SIZE: &str = "import.default_batch_size";
    pub const EXECUTION_MODE: &str = "import.execution_mode";

    // 消息语言
    pub const LOCALE: &str = "app.locale";
}
