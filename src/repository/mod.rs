// ==========================================
// 系统初始化导入中心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod import_history_repo;
pub mod import_job_repo;
pub mod module_status_repo;
pub mod record_store_repo;
pub mod registry_snapshot_repo;
pub mod session_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_history_repo::ImportHistoryRepository;
pub use import_job_repo::ImportJobRepository;
pub use module_status_repo::ModuleStatusRepository;
pub use record_store_repo::SqliteRecordStore;
pub use registry_snapshot_repo::RegistrySnapshotRepository;
pub use session_repo::ImportSessionRepository;
