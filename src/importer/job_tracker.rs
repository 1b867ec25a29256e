// ==========================================
// 系统初始化导入中心 - 任务状态与回滚
// ==========================================
// 职责: 进度查询 / 回滚资格判断 / 按任务回滚 / 模块导入历史
// 回滚: 只删除该任务新增的记录（update 覆盖的记录不还原）
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::job::{ImportContext, ImportHistoryRecord, ImportJob, ImportStatusView, RollbackOutcome};
use crate::domain::types::JobStatus;
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::runtime::ImportRuntime;
use serde_json::json;
use tracing::{info, instrument};

/// 模块历史查询默认条数
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
/// 模块历史查询上限
pub const MAX_HISTORY_LIMIT: usize = 100;

pub struct JobTracker {
    runtime: ImportRuntime,
}

impl JobTracker {
    pub fn new(runtime: ImportRuntime) -> Self {
        Self { runtime }
    }

    fn require_job(&self, job_id: &str) -> ImportResult<ImportJob> {
        self.runtime
            .jobs
            .find_by_id(job_id)?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))
    }

    fn job_can_rollback(&self, job: &ImportJob) -> bool {
        job.status == JobStatus::Completed
            && self
                .runtime
                .registry
                .get_service(&job.module_name)
                .is_some_and(|d| d.supports_rollback)
    }

    /// 查询任务状态
    ///
    /// # 错误
    /// - JobNotFound: 任务不存在，或不属于该模块
    pub fn get_import_status(&self, module_name: &str, job_id: &str) -> ImportResult<ImportStatusView> {
        let job = self.require_job(job_id)?;
        if job.module_name != module_name {
            return Err(ImportError::JobNotFound(job_id.to_string()));
        }

        Ok(ImportStatusView {
            estimated_completion: job.estimated_completion(self.runtime.now()),
            can_rollback: self.job_can_rollback(&job),
            job_id: job.job_id,
            module: job.module_name,
            status: job.status,
            progress: job.progress,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error: job.error,
        })
    }

    /// 是否可回滚（任务不存在时为 false）
    pub fn can_rollback(&self, job_id: &str) -> ImportResult<bool> {
        Ok(self
            .runtime
            .jobs
            .find_by_id(job_id)?
            .is_some_and(|job| self.job_can_rollback(&job)))
    }

    /// 回滚任务
    ///
    /// # 错误（按检查顺序）
    /// - JobNotFound
    /// - RollbackUnsupported: 模块不允许回滚
    /// - RollbackNotEligible: 任务不是 completed（含重复回滚）
    #[instrument(skip(self, ctx), fields(actor = %ctx.user_id))]
    pub fn rollback(&self, job_id: &str, ctx: &ImportContext) -> ImportResult<RollbackOutcome> {
        let rt = &self.runtime;
        let job = self.require_job(job_id)?;

        let supports_rollback = rt
            .registry
            .get_service(&job.module_name)
            .is_some_and(|d| d.supports_rollback);
        if !supports_rollback {
            return Err(ImportError::RollbackUnsupported(job.module_name.clone()));
        }

        let lock = rt.locks.lock_for(&job.module_name);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // 持锁后重新读取，避免与执行中的任务或另一个回滚交错
        let job = self.require_job(job_id)?;
        if job.status != JobStatus::Completed {
            return Err(ImportError::RollbackNotEligible {
                job_id: job_id.to_string(),
                status: job.status.as_str().to_string(),
            });
        }

        let now = rt.now();
        let deleted = rt
            .jobs
            .rollback_completed(job_id, &job.module_name, now, &ctx.user_id)?;
        rt.refresh_module_status(&job.module_name, None, None, None)?;

        info!(job_id, module = %job.module_name, deleted, "导入任务已回滚");
        rt.emit_audit(
            ActionLog::new(rt.ids.next_id(), ActionType::Rollback, now, &job.module_name, ctx)
                .with_job(job_id)
                .with_payload(json!({ "deletedRecords": deleted })),
        );

        Ok(RollbackOutcome {
            job_id: job_id.to_string(),
            message: t_with_args("rollback.success", &[("count", &deleted.to_string())]),
            deleted_records: deleted,
        })
    }

    /// 模块导入历史（limit 夹紧到 1..=100，缺省 10）
    pub fn get_import_history(
        &self,
        module_name: &str,
        limit: Option<usize>,
    ) -> ImportResult<Vec<ImportHistoryRecord>> {
        self.runtime.registry.require_service(module_name)?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.runtime.history.find_by_module(module_name, limit)?)
    }
}
