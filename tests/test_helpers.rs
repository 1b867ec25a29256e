// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、可控时钟、装配好的 API 实例
// ==========================================
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use system_init_import::api::{DashboardApi, SystemInitApi};
use system_init_import::clock::ManualClock;
use system_init_import::config::ImportSettings;
use system_init_import::db::{init_schema, open_sqlite_connection};
use system_init_import::domain::module::{ColumnType, ModuleDescriptor, TemplateColumn};
use system_init_import::domain::session::ValidationOutcome;
use system_init_import::domain::ImportContext;
use system_init_import::engine::builtin_modules::inventory_modules;
use system_init_import::engine::ModuleRegistry;
use system_init_import::ids::SequentialIdGenerator;
use system_init_import::importer::{ImportRuntime, UploadedFile};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试基准时间
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// 只有一个必填主键列的简单模块
pub fn simple_module(name: &str, deps: &[&str]) -> ModuleDescriptor {
    ModuleDescriptor::new(name, "test", name)
        .depends_on(deps)
        .key_column("code")
        .columns(vec![
            TemplateColumn::new("code", ColumnType::String).required(),
            TemplateColumn::new("name", ColumnType::String),
        ])
}

/// 测试环境
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub clock: Arc<ManualClock>,
    pub runtime: ImportRuntime,
    pub api: SystemInitApi,
    pub dashboard: DashboardApi,
}

impl TestEnv {
    /// 内置库存模块 + 默认配置
    pub fn new() -> Self {
        Self::with_modules(inventory_modules(), ImportSettings::default())
    }

    pub fn with_modules(modules: Vec<ModuleDescriptor>, settings: ImportSettings) -> Self {
        let (temp_file, db_path) = create_test_db().expect("无法创建测试数据库");
        let conn = Arc::new(Mutex::new(
            open_sqlite_connection(&db_path).expect("无法打开测试数据库"),
        ));
        let registry = ModuleRegistry::with_modules(modules).expect("模块注册失败");
        let clock = Arc::new(ManualClock::new(base_time()));

        let runtime = ImportRuntime::sqlite(conn.clone(), Arc::new(registry), settings)
            .with_clock(clock.clone())
            .with_ids(Arc::new(SequentialIdGenerator::new("t")));

        Self {
            _temp_file: temp_file,
            db_path,
            conn,
            clock,
            api: SystemInitApi::new(runtime.clone()),
            dashboard: DashboardApi::new(runtime.clone()),
            runtime,
        }
    }

    /// 校验一份 CSV（断言成功）
    pub fn validate_csv(&self, module: &str, csv: &str, skip_warnings: bool) -> ValidationOutcome {
        self.api
            .validate_file(
                module,
                &UploadedFile::new(&format!("{}.csv", module), csv.as_bytes().to_vec()),
                skip_warnings,
                &ImportContext::new("tester"),
            )
            .expect("文件校验失败")
    }
}
