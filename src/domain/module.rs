// ==========================================
// 系统初始化导入中心 - 模块描述领域模型
// ==========================================
// ModuleDescriptor: 进程启动时注册，生命周期内不可变
// ModuleRuntimeStatus: 每模块一行，由导入任务维护
// ==========================================

use crate::domain::types::ModuleImportStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 依赖排序默认优先级
pub const DEFAULT_PRIORITY: i32 = 100;

// ==========================================
// ColumnType - 模板列类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
}

// ==========================================
// TemplateColumn - 模板列定义（字段约束）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateColumn {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deprecated_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateColumn {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            column_type,
            required: false,
            max_length: None,
            min: None,
            max: None,
            pattern: None,
            enum_values: None,
            deprecated_values: Vec::new(),
            example: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn deprecated(mut self, values: &[&str]) -> Self {
        self.deprecated_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// 模板表头（displayName 优先）
    pub fn header(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// 上传文件表头是否对应本列（name 或 displayName，忽略大小写/首尾空白）
    pub fn matches_header(&self, header: &str) -> bool {
        let h = header.trim().trim_end_matches('*').trim();
        h.eq_ignore_ascii_case(&self.name)
            || self
                .display_name
                .as_deref()
                .is_some_and(|d| h.eq_ignore_ascii_case(d))
    }
}

// ==========================================
// ModuleDescriptor - 可导入模块描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub module: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dependencies: Vec<String>,
    pub priority: i32,
    pub tags: Vec<String>,
    pub supports_rollback: bool,
    pub version: String,

    /// 自然主键列（重复检测与冲突策略依据）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_column: Option<String>,

    /// 模板列定义
    #[serde(default, skip_serializing)]
    pub columns: Vec<TemplateColumn>,
}

impl ModuleDescriptor {
    pub fn new(module: &str, domain: &str, display_name: &str) -> Self {
        Self {
            module: module.to_string(),
            domain: domain.to_string(),
            subdomain: None,
            display_name: display_name.to_string(),
            description: None,
            dependencies: Vec::new(),
            priority: DEFAULT_PRIORITY,
            tags: Vec::new(),
            supports_rollback: true,
            version: "1.0.0".to_string(),
            key_column: None,
            columns: Vec::new(),
        }
    }

    pub fn subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = Some(subdomain.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn supports_rollback(mut self, supports_rollback: bool) -> Self {
        self.supports_rollback = supports_rollback;
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn key_column(mut self, key_column: &str) -> Self {
        self.key_column = Some(key_column.to_string());
        self
    }

    pub fn columns(mut self, columns: Vec<TemplateColumn>) -> Self {
        self.columns = columns;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

// ==========================================
// ModuleRuntimeStatus - 模块运行态
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRuntimeStatus {
    pub module_name: String,
    pub import_status: ModuleImportStatus,
    pub record_count: i64,
    pub last_import_date: Option<DateTime<Utc>>,
    pub last_job_id: Option<String>,
}

impl ModuleRuntimeStatus {
    /// 尚无状态行时的缺省值
    pub fn not_started(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            import_status: ModuleImportStatus::NotStarted,
            record_count: 0,
            last_import_date: None,
            last_job_id: None,
        }
    }
}
