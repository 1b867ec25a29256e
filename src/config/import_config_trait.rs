// ==========================================
// 系统初始化导入中心 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入链路所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_settings::{ExecutionMode, ImportSettings};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 上传文件大小上限（字节），默认 10 MiB
    async fn get_max_file_size_bytes(&self) -> RepositoryResult<usize>;

    /// 单文件数据行上限，默认 50000
    async fn get_max_rows(&self) -> RepositoryResult<usize>;

    /// 校验会话有效期（分钟），默认 30
    async fn get_session_ttl_minutes(&self) -> RepositoryResult<i64>;

    /// 默认批量写入行数，默认 100（取值 1..=10000）
    async fn get_default_batch_size(&self) -> RepositoryResult<usize>;

    /// 任务执行方式，默认 inline
    async fn get_execution_mode(&self) -> RepositoryResult<ExecutionMode>;

    /// 消息语言，默认 en
    async fn get_locale(&self) -> RepositoryResult<String>;

    /// 读取完整配置快照
    async fn load_import_settings(&self) -> RepositoryResult<ImportSettings> {
        Ok(ImportSettings {
            max_file_size_bytes: self.get_max_file_size_bytes().await?,
            max_rows: self.get_max_rows().await?,
            session_ttl_minutes: self.get_session_ttl_minutes().await?,
            default_batch_size: self.get_default_batch_size().await?,
            execution_mode: self.get_execution_mode().await?,
            locale: self.get_locale().await?,
        })
    }
}
