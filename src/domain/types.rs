// ==========================================
// 系统初始化导入中心 - 领域类型定义
// ==========================================
// 职责: 导入状态机、校验级别、冲突策略、文件格式等枚举
// 序列化格式: 与数据库/HTTP 契约一致（snake_case / SCREAMING）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 模块导入状态 (Module Import Status)
// ==========================================
// 每个模块一行，首次导入时惰性创建；缺省视为 NotStarted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleImportStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl ModuleImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleImportStatus::NotStarted => "not_started",
            ModuleImportStatus::InProgress => "in_progress",
            ModuleImportStatus::Completed => "completed",
            ModuleImportStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "not_started" => Some(ModuleImportStatus::NotStarted),
            "in_progress" => Some(ModuleImportStatus::InProgress),
            "completed" => Some(ModuleImportStatus::Completed),
            "failed" => Some(ModuleImportStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 导入任务状态 (Job Status)
// ==========================================
// 状态机:
//   pending -> running -> completed -> rolled_back
//   pending -> failed
//   running -> failed
// 终态: completed / failed / rolled_back（completed 仅允许回滚）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::RolledBack => "rolled_back",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "rolled_back" => Some(JobStatus::RolledBack),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::RolledBack
        )
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Completed, JobStatus::RolledBack)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 校验消息级别 (Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,   // 阻断导入
    Warning, // 需确认 skipWarnings
    Info,    // 提示
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

// ==========================================
// 冲突策略 (On Conflict)
// ==========================================
// skip: 忽略重复记录; update: 覆盖; error: 中止任务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Skip,
    Update,
    Error,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Skip => write!(f, "skip"),
            ConflictPolicy::Update => write!(f, "update"),
            ConflictPolicy::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 上传文件类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Excel,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Excel => "excel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(FileType::Csv),
            "excel" | "xlsx" | "xls" => Some(FileType::Excel),
            _ => None,
        }
    }

    /// 按文件扩展名推断（.xlsx/.xls 为 Excel，其余按 CSV 处理）
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            FileType::Excel
        } else {
            FileType::Csv
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 模板格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Csv,
    Excel,
}

impl TemplateFormat {
    /// 仅接受 csv / excel
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(TemplateFormat::Csv),
            "excel" => Some(TemplateFormat::Excel),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Csv => "csv",
            TemplateFormat::Excel => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TemplateFormat::Csv => "text/csv; charset=utf-8",
            TemplateFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

// ==========================================
// 导入受理状态（importData 返回）
// ==========================================
// queued: 后台执行; running: 当前调用内执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Queued,
    Running,
}
