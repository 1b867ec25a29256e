// ==========================================
// 系统初始化导入中心 - 记录写入端口
// ==========================================
// 执行器只经由 RecordSink 写业务数据，不感知具体实体表
// 默认实现: repository::record_store_repo::SqliteRecordStore
// ==========================================

use crate::domain::module::ModuleDescriptor;
use crate::domain::session::ValidatedRow;
use crate::domain::types::ConflictPolicy;
use crate::importer::error::ImportResult;
use chrono::{DateTime, Utc};

/// 单批写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchWriteOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl BatchWriteOutcome {
    /// 计入 importedRows 的行数（新增 + 覆盖）
    pub fn imported(&self) -> usize {
        self.inserted + self.updated
    }
}

pub trait RecordSink: Send + Sync {
    /// 写入一批记录（单事务）
    ///
    /// # 返回
    /// - `Err(ImportError::ConflictAbort)`: 冲突策略为 error 且命中重复主键，本批不落库
    /// - 其他 Err: 本批整体失败
    fn write_batch(
        &self,
        descriptor: &ModuleDescriptor,
        rows: &[ValidatedRow],
        job_id: &str,
        policy: ConflictPolicy,
        now: DateTime<Utc>,
    ) -> ImportResult<BatchWriteOutcome>;

    /// 删除指定任务新增的记录，返回删除行数（失败任务清理；回滚走 ImportJobRepository::rollback_completed）
    fn delete_by_job(&self, module_name: &str, job_id: &str) -> ImportResult<usize>;

    /// 模块当前记录数
    fn count_records(&self, module_name: &str) -> ImportResult<i64>;
}
