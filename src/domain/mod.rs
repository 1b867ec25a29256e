// ==========================================
// 系统初始化导入中心 - 领域模型层
// ==========================================
// 职责: 定义模块描述、校验会话、导入任务、操作日志
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod job;
pub mod module;
pub mod session;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use job::{
    ImportAccepted, ImportContext, ImportHistoryRecord, ImportJob, ImportOptions,
    ImportStatusView, ImportedBy, JobProgress, RollbackOutcome,
};
pub use module::{ColumnType, ModuleDescriptor, ModuleRuntimeStatus, TemplateColumn};
pub use session::{
    ValidatedRow, ValidationMessage, ValidationOutcome, ValidationSession, ValidationStats,
};
pub use types::{
    ConflictPolicy, DispatchStatus, FileType, JobStatus, ModuleImportStatus, Severity,
    TemplateFormat,
};
