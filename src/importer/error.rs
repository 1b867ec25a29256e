// ==========================================
// 系统初始化导入中心 - 导入错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传输层映射见 api::error::ApiError
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 模块注册 =====
    #[error("模块未注册: {0}")]
    ModuleNotFound(String),

    #[error("模块重复注册: {0}")]
    DuplicateModule(String),

    #[error("模块列定义无效 ({module}.{column}): {message}")]
    InvalidSchema {
        module: String,
        column: String,
        message: String,
    },

    // ===== 文件相关错误 =====
    #[error("文件过大: {size} 字节（上限 {max} 字节）")]
    FileTooLarge { size: usize, max: usize },

    #[error("数据行过多: {rows} 行（上限 {max} 行）")]
    TooManyRows { rows: usize, max: usize },

    #[error("不支持的模板格式: {0}（仅支持 csv/excel）")]
    UnsupportedFormat(String),

    #[error("文件为空或缺少表头: {0}")]
    EmptyFile(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("模板生成失败: {0}")]
    TemplateError(String),

    // ===== 会话 =====
    #[error("校验会话不存在或已被使用: {0}")]
    SessionNotFound(String),

    #[error("校验会话已过期: {0}")]
    SessionExpired(String),

    #[error("校验未通过，禁止导入 (session={session_id}, 错误行={error_rows}, 警告={warnings})")]
    ValidationBlocked {
        session_id: String,
        error_rows: usize,
        warnings: usize,
    },

    // ===== 任务 =====
    #[error("导入选项无效: {0}")]
    InvalidOptions(String),

    #[error("导入任务不存在: {0}")]
    JobNotFound(String),

    #[error("无效的任务状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("主键冲突，导入中止 (行 {row}): {key}")]
    ConflictAbort { row: usize, key: String },

    // ===== 回滚 =====
    #[error("模块不支持回滚: {0}")]
    RollbackUnsupported(String),

    #[error("任务不可回滚 (job={job_id}, status={status})")]
    RollbackNotEligible { job_id: String, status: String },

    // ===== 数据库错误 =====
    #[error("数据访问失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 错误代码（SCREAMING_SNAKE）
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::ModuleNotFound(_) => "MODULE_NOT_FOUND",
            ImportError::DuplicateModule(_) => "DUPLICATE_MODULE",
            ImportError::InvalidSchema { .. } => "INVALID_SCHEMA",
            ImportError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ImportError::TooManyRows { .. } => "TOO_MANY_ROWS",
            ImportError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ImportError::EmptyFile(_) => "EMPTY_FILE",
            ImportError::CsvParseError(_) => "CSV_PARSE_ERROR",
            ImportError::ExcelParseError(_) => "EXCEL_PARSE_ERROR",
            ImportError::TemplateError(_) => "TEMPLATE_ERROR",
            ImportError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ImportError::SessionExpired(_) => "SESSION_EXPIRED",
            ImportError::ValidationBlocked { .. } => "VALIDATION_BLOCKED",
            ImportError::InvalidOptions(_) => "INVALID_OPTIONS",
            ImportError::JobNotFound(_) => "JOB_NOT_FOUND",
            ImportError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ImportError::ConflictAbort { .. } => "CONFLICT_ABORT",
            ImportError::RollbackUnsupported(_) => "ROLLBACK_UNSUPPORTED",
            ImportError::RollbackNotEligible { .. } => "ROLLBACK_NOT_ELIGIBLE",
            ImportError::Repository(_) => "DATABASE_ERROR",
            ImportError::InternalError(_) => "INTERNAL_ERROR",
            ImportError::Other(_) => "OTHER_ERROR",
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ImportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ImportError::TemplateError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
