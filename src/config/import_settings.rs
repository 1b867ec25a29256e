// ==========================================
// 系统初始化导入中心 - 导入配置快照
// ==========================================
// 启动时从 config_kv 读取一次，之后按值传入各组件
// ==========================================

use serde::{Deserialize, Serialize};

/// 上传文件大小上限（10 MiB）
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
/// 单文件数据行上限
pub const DEFAULT_MAX_ROWS: usize = 50_000;
/// 校验会话有效期（分钟）
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;
/// 默认批量写入行数
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// 默认语言
pub const DEFAULT_LOCALE: &str = "en";

// ==========================================
// ExecutionMode - 导入任务执行方式
// ==========================================
// inline: 在 importData 调用内同步执行
// background: 交给 tokio 阻塞线程池执行，调用立即返回 queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Inline,
    Background,
}

impl ExecutionMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Some(ExecutionMode::Inline),
            "background" => Some(ExecutionMode::Background),
            _ => None,
        }
    }
}

// ==========================================
// ImportSettings
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub max_file_size_bytes: usize,
    pub max_rows: usize,
    pub session_ttl_minutes: i64,
    pub default_batch_size: usize,
    pub execution_mode: ExecutionMode,
    pub locale: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_rows: DEFAULT_MAX_ROWS,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            default_batch_size: DEFAULT_BATCH_SIZE,
            execution_mode: ExecutionMode::Inline,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl ImportSettings {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}
