// ==========================================
// 系统初始化导入中心 - 导入任务领域模型
// ==========================================
// ImportJob: 执行器写入，状态跟踪/驾驶舱读取
// ImportHistoryRecord: 任务完成时追加，只读
// ==========================================

use crate::domain::types::{ConflictPolicy, DispatchStatus, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 批量写入行数下限
pub const MIN_BATCH_SIZE: usize = 1;
/// 批量写入行数上限
pub const MAX_BATCH_SIZE: usize = 10_000;

// ==========================================
// ImportContext - 请求上下文（审计归属）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportContext {
    pub user_id: String,
    pub user_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ImportContext {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_name: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn system() -> Self {
        Self::new("system")
    }
}

// ==========================================
// ImportOptions - 执行选项
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    pub skip_warnings: bool,
    /// 缺省取配置 import.default_batch_size
    pub batch_size: Option<usize>,
    pub on_conflict: ConflictPolicy,
}

// ==========================================
// ImportedBy - 操作人
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedBy {
    pub id: String,
    pub name: Option<String>,
}

// ==========================================
// JobProgress - 任务进度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub total_rows: usize,
    pub imported_rows: usize,
    pub error_rows: usize,
    pub skipped_rows: usize,
    /// 已尝试写入的行数
    pub current_row: usize,
    pub percent_complete: f64,
}

impl JobProgress {
    pub fn new(total_rows: usize) -> Self {
        Self {
            total_rows,
            ..Default::default()
        }
    }

    /// percentComplete = importedRows / totalRows * 100
    pub fn recompute_percent(&mut self) {
        self.percent_complete = if self.total_rows == 0 {
            100.0
        } else {
            let pct = self.imported_rows as f64 / self.total_rows as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        };
    }

    pub fn all_attempted(&self) -> bool {
        self.current_row >= self.total_rows
    }
}

// ==========================================
// ImportJob - 导入任务
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub job_id: String,
    pub module_name: String,
    pub session_id: String,
    pub file_name: Option<String>,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub options: ImportOptions,
    pub batch_size: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub imported_by: ImportedBy,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub rolled_back_at: Option<DateTime<Utc>>,
    pub rolled_back_by: Option<String>,
    pub deleted_records: Option<usize>,
}

impl ImportJob {
    /// 估算完成时间
    ///
    /// - 运行中且已有进度: 按已导入速率外推剩余行
    /// - 终态: completedAt
    pub fn estimated_completion(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.status.is_terminal() {
            return self.completed_at;
        }
        if self.status != JobStatus::Running || self.progress.current_row == 0 {
            return None;
        }
        let elapsed_ms = (now - self.started_at).num_milliseconds().max(1) as f64;
        let rate_per_ms = self.progress.current_row as f64 / elapsed_ms;
        let remaining = self
            .progress
            .total_rows
            .saturating_sub(self.progress.current_row) as f64;
        let remaining_ms = (remaining / rate_per_ms).ceil() as i64;
        Some(now + chrono::Duration::milliseconds(remaining_ms))
    }
}

// ==========================================
// ImportHistoryRecord - 导入历史（追加写）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistoryRecord {
    pub job_id: String,
    pub module: String,
    pub status: JobStatus,
    pub records_imported: usize,
    pub completed_at: DateTime<Utc>,
    pub imported_by: ImportedBy,
}

// ==========================================
// 对外返回结构
// ==========================================

/// importData 受理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportAccepted {
    pub job_id: String,
    pub status: DispatchStatus,
}

/// getImportStatus 返回
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusView {
    pub job_id: String,
    pub module: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub can_rollback: bool,
}

/// rollback 返回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub job_id: String,
    pub message: String,
    pub deleted_records: usize,
}
