// ==========================================
// 系统初始化导入中心 - 审计端口
// ==========================================
// 红线: 所有改变数据的导入操作必须留痕
// 审计写入失败只告警，不影响导入主流程
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;

pub trait AuditSink: Send + Sync {
    fn record(&self, log: &ActionLog) -> RepositoryResult<()>;
}

/// 仅输出到 tracing 的审计实现（无数据库场景）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, log: &ActionLog) -> RepositoryResult<()> {
        tracing::info!(
            target: "audit",
            action_id = %log.action_id,
            action_type = %log.action_type,
            actor = %log.actor,
            module = %log.module_name,
            job_id = log.job_id.as_deref().unwrap_or(""),
            session_id = log.session_id.as_deref().unwrap_or(""),
            detail = log.detail.as_deref().unwrap_or(""),
            "audit"
        );
        Ok(())
    }
}
