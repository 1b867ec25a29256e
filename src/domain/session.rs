// ==========================================
// 系统初始化导入中心 - 校验会话领域模型
// ==========================================
// 生命周期: validate 创建 -> importData 消费一次 -> 过期作废
// ==========================================

use crate::domain::types::{FileType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ValidationMessage - 行级校验消息
// ==========================================
// row: 数据行号（1 起，不含表头）；0 表示文件级
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    pub row: usize,
    pub field: String,
    pub message: String,
    pub severity: Severity,
    pub code: String,
}

impl ValidationMessage {
    pub fn error(row: usize, field: &str, code: &str, message: String) -> Self {
        Self {
            row,
            field: field.to_string(),
            message,
            severity: Severity::Error,
            code: code.to_string(),
        }
    }

    pub fn warning(row: usize, field: &str, code: &str, message: String) -> Self {
        Self {
            row,
            field: field.to_string(),
            message,
            severity: Severity::Warning,
            code: code.to_string(),
        }
    }
}

// ==========================================
// ValidationStats - 校验统计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
}

// ==========================================
// ValidatedRow - 清洗后的数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRow {
    pub row_number: usize,
    pub values: BTreeMap<String, String>,
}

// ==========================================
// ValidationSession - 校验会话（持久化）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSession {
    pub session_id: String,
    pub module_name: String,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size_bytes: usize,
    pub rows: Vec<ValidatedRow>,
    pub errors: Vec<ValidationMessage>,
    pub warnings: Vec<ValidationMessage>,
    pub stats: ValidationStats,
    pub can_proceed: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl ValidationSession {
    pub fn is_valid(&self) -> bool {
        self.stats.error_rows == 0
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 执行闸门: canProceed，或调用方确认跳过警告且无错误行
    pub fn admits(&self, skip_warnings: bool) -> bool {
        self.can_proceed || (skip_warnings && self.is_valid())
    }
}

// ==========================================
// ValidationOutcome - validateFile 返回
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub session_id: String,
    pub is_valid: bool,
    pub errors: Vec<ValidationMessage>,
    pub warnings: Vec<ValidationMessage>,
    pub stats: ValidationStats,
    pub expires_at: DateTime<Utc>,
    pub can_proceed: bool,
}

impl From<&ValidationSession> for ValidationOutcome {
    fn from(session: &ValidationSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            is_valid: session.is_valid(),
            errors: session.errors.clone(),
            warnings: session.warnings.clone(),
            stats: session.stats,
            expires_at: session.expires_at,
            can_proceed: session.can_proceed,
        }
    }
}
