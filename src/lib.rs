// ==========================================
// 系统初始化导入中心 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 模块发现 / 依赖排序 / 模板 / 校验 / 批量导入 / 回滚
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 描述、会话、任务、审计
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 注册表与依赖排序
pub mod engine;

// 导入层 - 解析、校验、执行、回滚
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 性能埋点
pub mod perf;

// 时钟与 ID 端口
pub mod clock;
pub mod ids;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ConflictPolicy, DispatchStatus, FileType, JobStatus, ModuleImportStatus, Severity,
    TemplateFormat,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, ImportContext, ImportJob, ImportOptions, ModuleDescriptor,
    ModuleRuntimeStatus, TemplateColumn, ValidationOutcome, ValidationSession,
};

// 引擎
pub use engine::{DependencyResolver, ModuleRegistry};

// 导入层
pub use importer::{FileValidator, ImportError, ImportJobExecutor, ImportRuntime, JobTracker};

// API
pub use api::{ApiError, DashboardApi, SystemInitApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "系统初始化导入中心";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
