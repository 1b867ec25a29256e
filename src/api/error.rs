// ==========================================
// 系统初始化导入中心 - API层错误类型
// ==========================================
// 职责: 把导入层 / 仓储层错误收敛为传输层可用的错误码与 HTTP 状态
// 映射: 404 资源不存在 / 413 文件过大 / 400 请求可纠正 / 409 状态冲突 / 500 内部
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 资源不存在
    // ==========================================
    #[error("模块未注册: {0}")]
    ModuleNotFound(String),

    #[error("导入任务不存在: {0}")]
    JobNotFound(String),

    // ==========================================
    // 文件与格式
    // ==========================================
    #[error("文件过大: {size} 字节（上限 {max} 字节）")]
    FileTooLarge { size: usize, max: usize },

    #[error("请求体超过上限 {0} 字节")]
    PayloadTooLarge(usize),

    #[error("数据行过多: {rows} 行（上限 {max} 行）")]
    TooManyRows { rows: usize, max: usize },

    #[error("不支持的模板格式: {0}（仅支持 csv/excel）")]
    UnsupportedFormat(String),

    #[error("文件解析失败: {0}")]
    FileParse(String),

    #[error("文件为空或缺少表头: {0}")]
    EmptyFile(String),

    // ==========================================
    // 会话与导入门禁
    // ==========================================
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

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 回滚
    // ==========================================
    #[error("模块不支持回滚: {0}")]
    RollbackUnsupported(String),

    #[error("任务不可回滚 (job={job_id}, status={status})")]
    RollbackNotEligible { job_id: String, status: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 对外错误代码（SCREAMING_SNAKE）
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ModuleNotFound(_) => "MODULE_NOT_FOUND",
            ApiError::JobNotFound(_) => "JOB_NOT_FOUND",
            ApiError::FileTooLarge { .. } | ApiError::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            ApiError::TooManyRows { .. } => "TOO_MANY_ROWS",
            ApiError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ApiError::FileParse(_) => "FILE_PARSE_ERROR",
            ApiError::EmptyFile(_) => "EMPTY_FILE",
            ApiError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ApiError::SessionExpired(_) => "SESSION_EXPIRED",
            ApiError::ValidationBlocked { .. } => "VALIDATION_BLOCKED",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::RollbackUnsupported(_) => "ROLLBACK_UNSUPPORTED",
            ApiError::RollbackNotEligible { .. } => "ROLLBACK_NOT_ELIGIBLE",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::DatabaseError(_) | ApiError::DatabaseConnectionError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::ModuleNotFound(_) | ApiError::JobNotFound(_) => 404,
            ApiError::FileTooLarge { .. } | ApiError::PayloadTooLarge(_) => 413,
            ApiError::TooManyRows { .. }
            | ApiError::UnsupportedFormat(_)
            | ApiError::FileParse(_)
            | ApiError::EmptyFile(_)
            | ApiError::SessionNotFound(_)
            | ApiError::SessionExpired(_)
            | ApiError::ValidationBlocked { .. }
            | ApiError::InvalidInput(_)
            | ApiError::RollbackUnsupported(_)
            | ApiError::RollbackNotEligible { .. } => 400,
            ApiError::InvalidStateTransition { .. } => 409,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ModuleNotFound(m) => ApiError::ModuleNotFound(m),
            ImportError::JobNotFound(j) => ApiError::JobNotFound(j),
            ImportError::FileTooLarge { size, max } => ApiError::FileTooLarge { size, max },
            ImportError::TooManyRows { rows, max } => ApiError::TooManyRows { rows, max },
            ImportError::UnsupportedFormat(f) => ApiError::UnsupportedFormat(f),
            ImportError::CsvParseError(msg) | ImportError::ExcelParseError(msg) => {
                ApiError::FileParse(msg)
            }
            ImportError::EmptyFile(msg) => ApiError::EmptyFile(msg),
            ImportError::SessionNotFound(s) => ApiError::SessionNotFound(s),
            ImportError::SessionExpired(s) => ApiError::SessionExpired(s),
            ImportError::ValidationBlocked {
                session_id,
                error_rows,
                warnings,
            } => ApiError::ValidationBlocked {
                session_id,
                error_rows,
                warnings,
            },
            ImportError::InvalidOptions(msg) => ApiError::InvalidInput(msg),
            ImportError::RollbackUnsupported(m) => ApiError::RollbackUnsupported(m),
            ImportError::RollbackNotEligible { job_id, status } => {
                ApiError::RollbackNotEligible { job_id, status }
            }
            ImportError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            ImportError::ConflictAbort { row, key } => {
                ApiError::InvalidInput(format!("row {}: duplicate key '{}'", row, key))
            }
            ImportError::Repository(e) => ApiError::from(e),

            // 启动期错误（注册表 / 模板写出）在请求路径上视为内部错误
            e @ (ImportError::DuplicateModule(_)
            | ImportError::InvalidSchema { .. }
            | ImportError::TemplateError(_)
            | ImportError::InternalError(_)) => ApiError::InternalError(e.to_string()),
            ImportError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}取值异常: {}", field, message))
            }
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_status_mapping() {
        let cases: Vec<(ImportError, u16, &str)> = vec![
            (ImportError::ModuleNotFound("x".into()), 404, "MODULE_NOT_FOUND"),
            (ImportError::JobNotFound("j".into()), 404, "JOB_NOT_FOUND"),
            (ImportError::FileTooLarge { size: 11, max: 10 }, 413, "FILE_TOO_LARGE"),
            (ImportError::SessionExpired("s".into()), 400, "SESSION_EXPIRED"),
            (ImportError::CsvParseError("bad".into()), 400, "FILE_PARSE_ERROR"),
            (ImportError::InvalidOptions("batch".into()), 400, "INVALID_INPUT"),
            (ImportError::RollbackUnsupported("budgets".into()), 400, "ROLLBACK_UNSUPPORTED"),
            (ImportError::InternalError("boom".into()), 500, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.http_status(), status, "{}", api);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn test_repository_errors_are_server_side() {
        let api = ApiError::from(ImportError::Repository(RepositoryError::LockError("poisoned".into())));
        assert_eq!(api.http_status(), 500);
        assert_eq!(api.error_code(), "DATABASE_ERROR");
    }
}
