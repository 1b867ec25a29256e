// ==========================================
// 系统初始化导入中心 - 导入层
// ==========================================
// 职责: 模板生成、文件解析与校验、导入任务执行、状态跟踪与回滚
// 支持: Excel (.xlsx), CSV
// ==========================================

// 模块声明
pub mod audit;
pub mod conflict_handler;
pub mod error;
pub mod file_parser;
pub mod file_validator;
pub mod job_executor;
pub mod job_tracker;
pub mod record_sink;
pub mod row_validator;
pub mod runtime;
pub mod template_generator;

// 重导出核心类型
pub use audit::{AuditSink, TracingAuditSink};
pub use conflict_handler::ConflictHandler;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use file_validator::{FileValidator, UploadedFile};
pub use job_executor::ImportJobExecutor;
pub use job_tracker::JobTracker;
pub use record_sink::{BatchWriteOutcome, RecordSink};
pub use row_validator::RowValidator;
pub use runtime::{ImportRuntime, ModuleLocks};
pub use template_generator::{TemplateFile, TemplateGenerator};
