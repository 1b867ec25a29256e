// ==========================================
// 系统初始化导入中心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表（幂等，CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 建表（幂等）并写入 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS import_service_registry (
    module_name TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    subdomain TEXT,
    display_name TEXT NOT NULL,
    description TEXT,
    dependencies_json TEXT NOT NULL,
    priority INTEGER NOT NULL,
    tags_json TEXT NOT NULL,
    supports_rollback INTEGER NOT NULL,
    version TEXT NOT NULL,
    columns_json TEXT NOT NULL,
    registered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS module_runtime_status (
    module_name TEXT PRIMARY KEY,
    import_status TEXT NOT NULL DEFAULT 'not_started',
    record_count INTEGER NOT NULL DEFAULT 0,
    last_import_date TEXT,
    last_job_id TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS import_session (
    session_id TEXT PRIMARY KEY,
    module_name TEXT NOT NULL,
    file_name TEXT NOT NULL,
    file_type TEXT NOT NULL,
    file_size_bytes INTEGER NOT NULL,
    rows_json TEXT NOT NULL,
    errors_json TEXT NOT NULL,
    warnings_json TEXT NOT NULL,
    total_rows INTEGER NOT NULL,
    valid_rows INTEGER NOT NULL,
    error_rows INTEGER NOT NULL,
    can_proceed INTEGER NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    consumed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_import_session_expires ON import_session(expires_at);

CREATE TABLE IF NOT EXISTS import_job (
    job_id TEXT PRIMARY KEY,
    module_name TEXT NOT NULL,
    session_id TEXT NOT NULL,
    file_name TEXT,
    status TEXT NOT NULL,
    total_rows INTEGER NOT NULL DEFAULT 0,
    imported_rows INTEGER NOT NULL DEFAULT 0,
    error_rows INTEGER NOT NULL DEFAULT 0,
    skipped_rows INTEGER NOT NULL DEFAULT 0,
    current_row INTEGER NOT NULL DEFAULT 0,
    percent_complete REAL NOT NULL DEFAULT 0,
    options_json TEXT NOT NULL,
    batch_size INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    error_message TEXT,
    imported_by TEXT NOT NULL,
    imported_by_name TEXT,
    ip_address TEXT,
    user_agent TEXT,
    rolled_back_at TEXT,
    rolled_back_by TEXT,
    deleted_records INTEGER
);
CREATE INDEX IF NOT EXISTS idx_import_job_module ON import_job(module_name, started_at);

CREATE TABLE IF NOT EXISTS import_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    module_name TEXT NOT NULL,
    status TEXT NOT NULL,
    records_imported INTEGER NOT NULL,
    completed_at TEXT NOT NULL,
    imported_by TEXT NOT NULL,
    imported_by_name TEXT
);
CREATE INDEX IF NOT EXISTS idx_import_history_completed ON import_history(completed_at);

CREATE TABLE IF NOT EXISTS import_record (
    module_name TEXT NOT NULL,
    record_key TEXT NOT NULL,
    job_id TEXT NOT NULL,
    updated_job_id TEXT,
    payload_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (module_name, record_key)
);
CREATE INDEX IF NOT EXISTS idx_import_record_job ON import_record(job_id);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    actor_name TEXT,
    module_name TEXT NOT NULL,
    job_id TEXT,
    session_id TEXT,
    ip_address TEXT,
    user_agent TEXT,
    payload_json TEXT,
    detail TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_module ON action_log(module_name, action_ts);
"#;
