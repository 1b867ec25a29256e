// ==========================================
// 系统初始化导入中心 - 驾驶舱 API
// ==========================================
// 职责: 汇总注册表 + 模块运行态 + 导入历史，给出下一步推荐
// 约束: 只读；推荐仅供参考，不阻止任何导入
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::job::ImportHistoryRecord;
use crate::domain::module::ModuleRuntimeStatus;
use crate::domain::types::ModuleImportStatus;
use crate::engine::DependencyResolver;
use crate::importer::job_tracker::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::importer::ImportRuntime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// 推荐列表上限
pub const MAX_RECOMMENDATIONS: usize = 5;

/// 驾驶舱查询选项
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardOptions {
    pub include_history: bool,
    /// 缺省 10，夹紧到 1..=100
    pub history_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_modules: usize,
    pub completed_modules: usize,
    pub in_progress_modules: usize,
    pub failed_modules: usize,
    pub not_started_modules: usize,
    pub total_records: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainModuleEntry {
    pub module: String,
    pub display_name: String,
    pub import_status: ModuleImportStatus,
    pub record_count: i64,
}

/// 单个领域的汇总
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSummary {
    pub total: usize,
    pub completed: usize,
    pub modules: Vec<DomainModuleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub module: String,
    pub display_name: String,
    pub domain: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub overview: DashboardOverview,
    pub modules_by_domain: BTreeMap<String, DomainSummary>,
    pub recent_imports: Vec<ImportHistoryRecord>,
    pub next_recommended: Vec<Recommendation>,
}

// ==========================================
// DashboardApi
// ==========================================
pub struct DashboardApi {
    runtime: ImportRuntime,
}

impl DashboardApi {
    pub fn new(runtime: ImportRuntime) -> Self {
        Self { runtime }
    }

    /// 驾驶舱数据
    pub fn get_dashboard_data(&self, options: DashboardOptions) -> ApiResult<DashboardData> {
        let statuses = self.runtime.module_status.find_all()?;
        let status_of = |module: &str| -> ModuleImportStatus {
            statuses
                .get(module)
                .map(|s| s.import_status)
                .unwrap_or(ModuleImportStatus::NotStarted)
        };

        // === 概览与按领域分组（注册顺序） ===
        let mut overview = DashboardOverview::default();
        let mut modules_by_domain: BTreeMap<String, DomainSummary> = BTreeMap::new();
        for d in self.runtime.registry.get_all_services() {
            let status = status_of(&d.module);
            let record_count = statuses.get(&d.module).map_or(0, |s| s.record_count);

            overview.total_modules += 1;
            overview.total_records += record_count;
            match status {
                ModuleImportStatus::Completed => overview.completed_modules += 1,
                ModuleImportStatus::InProgress => overview.in_progress_modules += 1,
                ModuleImportStatus::Failed => overview.failed_modules += 1,
                ModuleImportStatus::NotStarted => overview.not_started_modules += 1,
            }

            let group = modules_by_domain.entry(d.domain.clone()).or_default();
            group.total += 1;
            if status == ModuleImportStatus::Completed {
                group.completed += 1;
            }
            group.modules.push(DomainModuleEntry {
                module: d.module.clone(),
                display_name: d.display_name.clone(),
                import_status: status,
                record_count,
            });
        }

        let recent_imports = if options.include_history {
            let limit = options
                .history_limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT);
            self.runtime.history.find_recent(limit)?
        } else {
            Vec::new()
        };

        Ok(DashboardData {
            overview,
            modules_by_domain,
            recent_imports,
            next_recommended: self.recommend(&statuses),
        })
    }

    /// 按解析顺序推荐：自身未开始且全部依赖已完成
    fn recommend(&self, statuses: &HashMap<String, ModuleRuntimeStatus>) -> Vec<Recommendation> {
        let is_completed = |module: &str| {
            statuses
                .get(module)
                .is_some_and(|s| s.import_status == ModuleImportStatus::Completed)
        };
        let registry = &self.runtime.registry;

        DependencyResolver::new(registry)
            .get_import_order_with_reasons()
            .into_iter()
            .filter_map(|entry| {
                let d = registry.get_service(&entry.module)?;
                let not_started = statuses
                    .get(&d.module)
                    .map_or(true, |s| s.import_status == ModuleImportStatus::NotStarted);
                let ready = d.dependencies.iter().all(|dep| is_completed(dep));
                (not_started && ready).then(|| Recommendation {
                    module: d.module.clone(),
                    display_name: d.display_name.clone(),
                    domain: d.domain.clone(),
                    reason: entry.reason,
                })
            })
            .take(MAX_RECOMMENDATIONS)
            .collect()
    }
}
