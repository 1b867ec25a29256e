// ==========================================
// 系统初始化导入中心 - 系统初始化 API
// ==========================================
// 职责: 模块发现 / 导入顺序 / 模板 / 校验 / 执行 / 状态 / 回滚 / 健康检查
// 架构: HTTP 层 → SystemInitApi → importer (校验器 / 执行器 / 跟踪器)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::job::{
    ImportAccepted, ImportContext, ImportHistoryRecord, ImportOptions, ImportStatusView,
    RollbackOutcome,
};
use crate::domain::module::{ModuleDescriptor, TemplateColumn};
use crate::domain::session::ValidationOutcome;
use crate::domain::types::{JobStatus, ModuleImportStatus, TemplateFormat};
use crate::engine::{CircularDependency, DependencyResolver, ImportOrderEntry};
use crate::importer::{
    FileValidator, ImportJobExecutor, ImportRuntime, JobTracker, TemplateFile, TemplateGenerator,
    UploadedFile,
};
use crate::repository::RegistrySnapshotRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

// ==========================================
// 响应视图
// ==========================================

/// 可导入模块（注册信息 + 运行态）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModule {
    #[serde(flatten)]
    pub descriptor: ModuleDescriptor,
    pub import_status: ModuleImportStatus,
    pub record_count: i64,
    pub last_import_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModulesView {
    pub modules: Vec<AvailableModule>,
    /// 过滤后、截断前的模块数
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOrderView {
    pub order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ImportOrderEntry>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatusView {
    pub is_healthy: bool,
    pub total_modules: usize,
    pub validation_errors: Vec<String>,
    pub circular_dependencies: Vec<CircularDependency>,
    /// 仓储不可用时为 None
    pub running_jobs: Option<i64>,
}

/// 模块列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    pub domain: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

// ==========================================
// SystemInitApi
// ==========================================
pub struct SystemInitApi {
    runtime: ImportRuntime,
    validator: FileValidator,
    executor: ImportJobExecutor,
    tracker: JobTracker,
}

impl SystemInitApi {
    pub fn new(runtime: ImportRuntime) -> Self {
        Self {
            validator: FileValidator::new(runtime.clone()),
            executor: ImportJobExecutor::new(runtime.clone()),
            tracker: JobTracker::new(runtime.clone()),
            runtime,
        }
    }

    pub fn runtime(&self) -> &ImportRuntime {
        &self.runtime
    }

    // ==========================================
    // 模块发现
    // ==========================================

    /// 可导入模块列表（注册顺序），附带运行态
    pub fn get_available_modules(&self, filter: &ModuleFilter) -> ApiResult<AvailableModulesView> {
        let statuses = self.runtime.module_status.find_all()?;

        let matched: Vec<&ModuleDescriptor> = self
            .runtime
            .registry
            .get_all_services()
            .iter()
            .filter(|d| filter.domain.as_deref().map_or(true, |domain| d.domain == domain))
            .filter(|d| filter.tag.as_deref().map_or(true, |tag| d.has_tag(tag)))
            .collect();
        let total = matched.len();

        let modules = matched
            .into_iter()
            .take(filter.limit.unwrap_or(usize::MAX))
            .map(|d| {
                let status = statuses.get(&d.module);
                AvailableModule {
                    descriptor: d.clone(),
                    import_status: status
                        .map(|s| s.import_status)
                        .unwrap_or(ModuleImportStatus::NotStarted),
                    record_count: status.map_or(0, |s| s.record_count),
                    last_import_date: status.and_then(|s| s.last_import_date),
                }
            })
            .collect();

        Ok(AvailableModulesView { modules, total })
    }

    /// 推荐导入顺序
    pub fn get_import_order(&self, include_details: bool) -> ImportOrderView {
        let entries = DependencyResolver::new(&self.runtime.registry).get_import_order_with_reasons();
        ImportOrderView {
            order: entries.iter().map(|e| e.module.clone()).collect(),
            details: include_details.then_some(entries),
        }
    }

    // ==========================================
    // 模板
    // ==========================================

    pub fn get_template_columns(&self, module_name: &str) -> ApiResult<Vec<TemplateColumn>> {
        Ok(self.runtime.registry.require_service(module_name)?.columns.clone())
    }

    /// 生成导入模板
    ///
    /// # 错误
    /// - ModuleNotFound
    /// - UnsupportedFormat: format 不是 csv / excel
    pub fn generate_template(&self, module_name: &str, format: &str) -> ApiResult<TemplateFile> {
        let descriptor = self.runtime.registry.require_service(module_name)?;
        let format = TemplateFormat::from_str(format)
            .ok_or_else(|| ApiError::UnsupportedFormat(format.to_string()))?;
        let today = self.runtime.now().date_naive();
        Ok(TemplateGenerator.generate(descriptor, format, today)?)
    }

    // ==========================================
    // 校验与执行
    // ==========================================

    pub fn validate_file(
        &self,
        module_name: &str,
        file: &UploadedFile,
        skip_warnings: bool,
        ctx: &ImportContext,
    ) -> ApiResult<ValidationOutcome> {
        Ok(self.validator.validate_file(module_name, file, skip_warnings, ctx)?)
    }

    pub fn import_data(
        &self,
        module_name: &str,
        session_id: &str,
        options: ImportOptions,
        ctx: &ImportContext,
    ) -> ApiResult<ImportAccepted> {
        if session_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("sessionId 不能为空".to_string()));
        }
        Ok(self.executor.import_data(module_name, session_id, options, ctx)?)
    }

    // ==========================================
    // 状态与回滚
    // ==========================================

    pub fn get_import_status(&self, module_name: &str, job_id: &str) -> ApiResult<ImportStatusView> {
        Ok(self.tracker.get_import_status(module_name, job_id)?)
    }

    pub fn can_rollback(&self, job_id: &str) -> ApiResult<bool> {
        Ok(self.tracker.can_rollback(job_id)?)
    }

    /// 回滚任务（任务必须属于该模块）
    #[instrument(skip(self, ctx))]
    pub fn rollback(
        &self,
        module_name: &str,
        job_id: &str,
        ctx: &ImportContext,
    ) -> ApiResult<RollbackOutcome> {
        let job = self
            .runtime
            .jobs
            .find_by_id(job_id)?
            .ok_or_else(|| ApiError::JobNotFound(job_id.to_string()))?;
        if job.module_name != module_name {
            return Err(ApiError::JobNotFound(job_id.to_string()));
        }
        Ok(self.tracker.rollback(job_id, ctx)?)
    }

    pub fn get_import_history(
        &self,
        module_name: &str,
        limit: Option<usize>,
    ) -> ApiResult<Vec<ImportHistoryRecord>> {
        Ok(self.tracker.get_import_history(module_name, limit)?)
    }

    // ==========================================
    // 健康检查与注册快照
    // ==========================================

    /// 健康状态（不返回错误）
    pub fn health_status(&self) -> HealthStatusView {
        let health = self.runtime.registry.health();
        let running_jobs = match self.runtime.jobs.count_by_status(JobStatus::Running) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "统计运行中任务失败");
                None
            }
        };

        HealthStatusView {
            is_healthy: health.is_healthy,
            total_modules: self.runtime.registry.len(),
            validation_errors: health.validation_errors,
            circular_dependencies: health.circular_dependencies,
            running_jobs,
        }
    }

    /// 写入注册快照；失败只记录日志
    pub fn persist_registry_snapshot(&self, repo: &RegistrySnapshotRepository) {
        match repo.replace_all(self.runtime.registry.get_all_services(), self.runtime.now()) {
            Ok(count) => info!(count, "模块注册快照已写入"),
            Err(e) => warn!(error = %e, "模块注册快照写入失败"),
        }
    }
}
