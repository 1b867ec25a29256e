// ==========================================
// 系统初始化导入中心 - 导入运行时依赖
// ==========================================
// 职责: 汇集校验器 / 执行器 / 跟踪器共用的端口与仓储（构造注入）
// 约束: 无全局单例，所有依赖以 Arc 共享
// ==========================================

use crate::clock::{Clock, SystemClock};
use crate::config::ImportSettings;
use crate::domain::action_log::ActionLog;
use crate::domain::module::ModuleRuntimeStatus;
use crate::domain::types::ModuleImportStatus;
use crate::engine::ModuleRegistry;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::importer::audit::AuditSink;
use crate::importer::error::ImportResult;
use crate::importer::record_sink::RecordSink;
use crate::repository::{
    ActionLogRepository, ImportHistoryRepository, ImportJobRepository, ImportSessionRepository,
    ModuleStatusRepository, SqliteRecordStore,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ModuleLocks - 按模块串行化
// ==========================================
// 同一模块的导入任务 / 回滚 / 状态写入互斥；不同模块互不影响
#[derive(Debug, Default)]
pub struct ModuleLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ModuleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得模块锁（调用方自行 lock）
    pub fn lock_for(&self, module_name: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(module_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

// ==========================================
// ImportRuntime
// ==========================================
#[derive(Clone)]
pub struct ImportRuntime {
    pub registry: Arc<ModuleRegistry>,
    pub sessions: Arc<ImportSessionRepository>,
    pub jobs: Arc<ImportJobRepository>,
    pub history: Arc<ImportHistoryRepository>,
    pub module_status: Arc<ModuleStatusRepository>,
    pub records: Arc<dyn RecordSink>,
    pub audit: Arc<dyn AuditSink>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub locks: Arc<ModuleLocks>,
    pub settings: ImportSettings,
}

impl ImportRuntime {
    /// 基于单个 SQLite 连接装配全部默认实现
    pub fn sqlite(
        conn: Arc<Mutex<Connection>>,
        registry: Arc<ModuleRegistry>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            registry,
            sessions: Arc::new(ImportSessionRepository::new(conn.clone())),
            jobs: Arc::new(ImportJobRepository::new(conn.clone())),
            history: Arc::new(ImportHistoryRepository::new(conn.clone())),
            module_status: Arc::new(ModuleStatusRepository::new(conn.clone())),
            records: Arc::new(SqliteRecordStore::new(conn.clone())),
            audit: Arc::new(ActionLogRepository::new(conn)),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            locks: Arc::new(ModuleLocks::new()),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 写审计日志；失败只告警
    pub fn emit_audit(&self, log: ActionLog) {
        if let Err(e) = self.audit.record(&log) {
            tracing::warn!(
                action_type = %log.action_type,
                module = %log.module_name,
                error = %e,
                "审计日志写入失败"
            );
        }
    }

    /// 刷新模块运行态（调用方须持有该模块锁）
    ///
    /// # 参数
    /// - status: 新状态；None 表示按记录数推断（0 -> not_started，否则 completed）
    /// - imported_at: Some 时更新 lastImportDate
    pub fn refresh_module_status(
        &self,
        module_name: &str,
        status: Option<ModuleImportStatus>,
        job_id: Option<&str>,
        imported_at: Option<DateTime<Utc>>,
    ) -> ImportResult<ModuleRuntimeStatus> {
        let mut current = self.module_status.get_or_default(module_name)?;
        current.record_count = self.records.count_records(module_name)?;
        current.import_status = status.unwrap_or(if current.record_count == 0 {
            ModuleImportStatus::NotStarted
        } else {
            ModuleImportStatus::Completed
        });
        if let Some(job_id) = job_id {
            current.last_job_id = Some(job_id.to_string());
        }
        if imported_at.is_some() {
            current.last_import_date = imported_at;
        }
        self.module_status.upsert(&current, self.now())?;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_module_shares_lock() {
        let locks = ModuleLocks::new();
        let a1 = locks.lock_for("drugs");
        let a2 = locks.lock_for("drugs");
        let b = locks.lock_for("users");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_refresh_module_status_infers_from_count() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let registry = Arc::new(ModuleRegistry::new());
        let rt = ImportRuntime::sqlite(Arc::new(Mutex::new(conn)), registry, ImportSettings::default());

        let status = rt.refresh_module_status("drugs", None, None, None).unwrap();
        assert_eq!(status.import_status, ModuleImportStatus::NotStarted);

        let status = rt
            .refresh_module_status("drugs", Some(ModuleImportStatus::InProgress), Some("job-1"), None)
            .unwrap();
        assert_eq!(status.import_status, ModuleImportStatus::InProgress);
        assert_eq!(status.last_job_id.as_deref(), Some("job-1"));
    }
}
