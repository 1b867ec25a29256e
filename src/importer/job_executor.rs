// ==========================================
// 系统初始化导入中心 - 导入任务执行器
// ==========================================
// 流程: 校验会话 → 闸门检查 → 抢占会话 → 建任务(pending)
//       → 分批写入(running) → completed / failed
// 执行方式: inline（调用内完成）/ background（tokio 阻塞线程池）
// 红线: 同一模块的任务串行执行（ModuleLocks）
// ==========================================

use crate::config::ExecutionMode;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::job::{
    ImportAccepted, ImportContext, ImportHistoryRecord, ImportJob, ImportOptions, ImportedBy,
    JobProgress, MAX_BATCH_SIZE, MIN_BATCH_SIZE,
};
use crate::domain::module::ModuleDescriptor;
use crate::domain::session::ValidationSession;
use crate::domain::types::{DispatchStatus, JobStatus, ModuleImportStatus};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::runtime::ImportRuntime;
use crate::perf::PerfGuard;
use serde_json::json;
use tracing::{error, info, instrument, warn};

/// 已受理、待执行的任务
struct PreparedJob {
    job: ImportJob,
    descriptor: ModuleDescriptor,
    session: ValidationSession,
}

#[derive(Clone)]
pub struct ImportJobExecutor {
    runtime: ImportRuntime,
}

impl ImportJobExecutor {
    pub fn new(runtime: ImportRuntime) -> Self {
        Self { runtime }
    }

    /// 受理导入请求
    ///
    /// # 返回
    /// - inline: 任务已执行完毕（成功或失败均反映在任务状态中），status = running
    /// - background: 任务已入队，status = queued
    ///
    /// # 错误
    /// - ModuleNotFound / InvalidOptions / SessionNotFound / SessionExpired / ValidationBlocked
    #[instrument(skip(self, options, ctx), fields(module = %module_name, session_id = %session_id))]
    pub fn import_data(
        &self,
        module_name: &str,
        session_id: &str,
        options: ImportOptions,
        ctx: &ImportContext,
    ) -> ImportResult<ImportAccepted> {
        let prepared = self.prepare(module_name, session_id, options, ctx)?;
        let job_id = prepared.job.job_id.clone();

        let status = match self.runtime.settings.execution_mode {
            ExecutionMode::Inline => {
                self.run(prepared, ctx);
                DispatchStatus::Running
            }
            ExecutionMode::Background => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let executor = self.clone();
                    let ctx = ctx.clone();
                    handle.spawn_blocking(move || executor.run(prepared, &ctx));
                    DispatchStatus::Queued
                }
                Err(_) => {
                    warn!(job_id = %job_id, "无 tokio 运行时，改为同步执行");
                    self.run(prepared, ctx);
                    DispatchStatus::Running
                }
            },
        };

        Ok(ImportAccepted { job_id, status })
    }

    // ==========================================
    // 受理阶段
    // ==========================================

    fn prepare(
        &self,
        module_name: &str,
        session_id: &str,
        options: ImportOptions,
        ctx: &ImportContext,
    ) -> ImportResult<PreparedJob> {
        let rt = &self.runtime;
        let descriptor = rt.registry.require_service(module_name)?.clone();

        let batch_size = options.batch_size.unwrap_or(rt.settings.default_batch_size);
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(ImportError::InvalidOptions(format!(
                "batchSize 必须在 {}..={} 之间，实际 {}",
                MIN_BATCH_SIZE, MAX_BATCH_SIZE, batch_size
            )));
        }

        let now = rt.now();
        let session = rt
            .sessions
            .find_by_id(session_id)?
            .filter(|s| s.module_name == descriptor.module && s.consumed_at.is_none())
            .ok_or_else(|| ImportError::SessionNotFound(session_id.to_string()))?;
        if session.is_expired(now) {
            return Err(ImportError::SessionExpired(session_id.to_string()));
        }
        if !session.admits(options.skip_warnings) {
            return Err(ImportError::ValidationBlocked {
                session_id: session_id.to_string(),
                error_rows: session.stats.error_rows,
                warnings: session.warnings.len(),
            });
        }

        // 并发请求同一会话时只有一个能抢占成功
        if !rt.sessions.consume(session_id, now)? {
            return Err(ImportError::SessionNotFound(session_id.to_string()));
        }

        let job = ImportJob {
            job_id: rt.ids.next_id(),
            module_name: descriptor.module.clone(),
            session_id: session_id.to_string(),
            file_name: Some(session.file_name.clone()),
            status: JobStatus::Pending,
            progress: JobProgress::new(session.rows.len()),
            options,
            batch_size,
            started_at: now,
            completed_at: None,
            error: None,
            imported_by: ImportedBy {
                id: ctx.user_id.clone(),
                name: ctx.user_name.clone(),
            },
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            rolled_back_at: None,
            rolled_back_by: None,
            deleted_records: None,
        };
        rt.jobs.insert(&job)?;

        info!(
            job_id = %job.job_id,
            total_rows = job.progress.total_rows,
            batch_size,
            on_conflict = ?options.on_conflict,
            "导入任务已受理"
        );

        Ok(PreparedJob {
            job,
            descriptor,
            session,
        })
    }

    // ==========================================
    // 执行阶段
    // ==========================================

    /// 执行任务；所有结果写入任务记录，不向调用方返回错误
    fn run(&self, prepared: PreparedJob, ctx: &ImportContext) {
        let _perf = PerfGuard::new("import_job");
        let rt = &self.runtime;
        let job_id = prepared.job.job_id.clone();
        let module = prepared.job.module_name.clone();

        let lock = rt.locks.lock_for(&module);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = self.execute_locked(&prepared, ctx) {
            error!(job_id = %job_id, module = %module, error = %e, "导入任务失败");
            self.fail(&prepared.job, &e, ctx);
        }
    }

    fn execute_locked(&self, prepared: &PreparedJob, ctx: &ImportContext) -> ImportResult<()> {
        let rt = &self.runtime;
        let PreparedJob {
            job,
            descriptor,
            session,
        } = prepared;

        rt.jobs.mark_running(&job.job_id)?;
        rt.refresh_module_status(
            &job.module_name,
            Some(ModuleImportStatus::InProgress),
            Some(&job.job_id),
            None,
        )?;
        rt.emit_audit(
            ActionLog::new(rt.ids.next_id(), ActionType::ImportStart, rt.now(), &job.module_name, ctx)
                .with_job(&job.job_id)
                .with_session(&job.session_id)
                .with_payload(json!({
                    "totalRows": job.progress.total_rows,
                    "batchSize": job.batch_size,
                    "onConflict": job.options.on_conflict,
                })),
        );

        let mut progress = JobProgress::new(session.rows.len());
        for (batch_no, chunk) in session.rows.chunks(job.batch_size).enumerate() {
            match rt.records.write_batch(
                descriptor,
                chunk,
                &job.job_id,
                job.options.on_conflict,
                rt.now(),
            ) {
                Ok(outcome) => {
                    progress.imported_rows += outcome.imported();
                    progress.skipped_rows += outcome.skipped;
                }
                Err(e @ ImportError::ConflictAbort { .. }) => return Err(e),
                Err(e) => {
                    warn!(job_id = %job.job_id, batch_no, rows = chunk.len(), error = %e, "批次写入失败");
                    progress.error_rows += chunk.len();
                }
            }
            progress.current_row += chunk.len();
            progress.recompute_percent();
            rt.jobs.update_progress(&job.job_id, &progress)?;
        }
        progress.recompute_percent();

        let completed_at = rt.now();
        rt.jobs
            .finish(&job.job_id, JobStatus::Running, JobStatus::Completed, completed_at, None)?;
        rt.refresh_module_status(
            &job.module_name,
            Some(ModuleImportStatus::Completed),
            Some(&job.job_id),
            Some(completed_at),
        )?;
        rt.history.append(&ImportHistoryRecord {
            job_id: job.job_id.clone(),
            module: job.module_name.clone(),
            status: JobStatus::Completed,
            records_imported: progress.imported_rows,
            completed_at,
            imported_by: job.imported_by.clone(),
        })?;

        info!(
            job_id = %job.job_id,
            imported = progress.imported_rows,
            skipped = progress.skipped_rows,
            errors = progress.error_rows,
            "导入任务完成"
        );
        rt.emit_audit(
            ActionLog::new(rt.ids.next_id(), ActionType::ImportComplete, completed_at, &job.module_name, ctx)
                .with_job(&job.job_id)
                .with_payload(json!({
                    "importedRows": progress.imported_rows,
                    "skippedRows": progress.skipped_rows,
                    "errorRows": progress.error_rows,
                })),
        );
        Ok(())
    }

    /// 失败收尾: 补偿删除本任务已写入的记录 → 任务 failed → 模块 failed
    fn fail(&self, job: &ImportJob, cause: &ImportError, ctx: &ImportContext) {
        let rt = &self.runtime;
        let message = match cause {
            ImportError::ConflictAbort { row, key } => format!("row {}: duplicate key '{}'", row, key),
            other => other.to_string(),
        };

        match rt.records.delete_by_job(&job.module_name, &job.job_id) {
            Ok(0) => {}
            Ok(removed) => info!(job_id = %job.job_id, removed, "已补偿删除失败任务写入的记录"),
            Err(e) => error!(job_id = %job.job_id, error = %e, "补偿删除失败"),
        }

        let failed_at = rt.now();
        let from = match rt.jobs.find_by_id(&job.job_id) {
            Ok(Some(current)) => current.status,
            _ => JobStatus::Running,
        };
        if from.can_transition_to(JobStatus::Failed) {
            if let Err(e) = rt
                .jobs
                .finish(&job.job_id, from, JobStatus::Failed, failed_at, Some(&message))
            {
                error!(job_id = %job.job_id, error = %e, "任务状态写入失败");
            }
        }

        if let Err(e) = rt.refresh_module_status(
            &job.module_name,
            Some(ModuleImportStatus::Failed),
            Some(&job.job_id),
            None,
        ) {
            error!(module = %job.module_name, error = %e, "模块状态写入失败");
        }

        rt.emit_audit(
            ActionLog::new(rt.ids.next_id(), ActionType::ImportFail, failed_at, &job.module_name, ctx)
                .with_job(&job.job_id)
                .with_detail(message),
        );
    }
}
