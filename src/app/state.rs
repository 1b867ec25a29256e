// ==========================================
// 系统初始化导入中心 - 应用状态
// ==========================================
// 职责: 装配共享连接、配置快照、注册表与 API 实例
// 使用: axum Router 的 State（Clone 廉价，内部全部为 Arc）
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ApiError, DashboardApi, SystemInitApi};
use crate::config::{ConfigManager, ImportConfigReader, ImportSettings};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::builtin_modules::inventory_modules;
use crate::engine::ModuleRegistry;
use crate::importer::ImportRuntime;
use crate::repository::{RegistrySnapshotRepository, RepositoryError};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 系统初始化 API（发现 / 模板 / 校验 / 执行 / 回滚）
    pub system_init_api: Arc<SystemInitApi>,

    /// 驾驶舱 API
    pub dashboard_api: Arc<DashboardApi>,

    /// 启动时加载的配置快照
    pub settings: ImportSettings,
}

impl AppState {
    /// 基于已装配的运行时创建（测试可注入时钟 / ID / 记录端口）
    pub fn from_runtime(runtime: ImportRuntime) -> Self {
        Self {
            settings: runtime.settings.clone(),
            dashboard_api: Arc::new(DashboardApi::new(runtime.clone())),
            system_init_api: Arc::new(SystemInitApi::new(runtime)),
        }
    }

    /// 打开数据库并完成全部初始化
    ///
    /// # 说明
    /// 1. 打开连接、建表
    /// 2. 从 config_kv 读取导入配置（消息语言由调用方按 settings.locale 切换）
    /// 3. 注册内置模块，写入注册快照（失败不阻塞启动）
    pub async fn open(db_path: &str) -> Result<Self, ApiError> {
        tracing::info!(db_path, "初始化AppState");

        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("无法打开数据库: {}", e)))?;
        init_schema(&conn).map_err(RepositoryError::from)?;
        let conn = Arc::new(Mutex::new(conn));

        let settings = ConfigManager::from_connection(conn.clone())
            .load_import_settings()
            .await?;
        tracing::info!(
            max_file_size_bytes = settings.max_file_size_bytes,
            max_rows = settings.max_rows,
            session_ttl_minutes = settings.session_ttl_minutes,
            execution_mode = ?settings.execution_mode,
            locale = %settings.locale,
            "导入配置已加载"
        );

        let registry = ModuleRegistry::with_modules(inventory_modules())?;
        if !registry.is_healthy() {
            tracing::warn!(
                errors = ?registry.get_validation_errors(),
                "模块注册表自检未通过（仍继续启动）"
            );
        }

        let runtime = ImportRuntime::sqlite(conn.clone(), Arc::new(registry), settings);
        let state = Self::from_runtime(runtime);
        state
            .system_init_api
            .persist_registry_snapshot(&RegistrySnapshotRepository::new(conn));

        Ok(state)
    }
}

/// 获取默认数据库路径
///
/// 优先级: IMPORT_HUB_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("IMPORT_HUB_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./import_hub.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("system-init-import");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("import_hub.db");
        }
    }

    path.to_string_lossy().to_string()
}
