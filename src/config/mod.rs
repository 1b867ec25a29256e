// ==========================================
// 系统初始化导入中心 - 配置层
// ==========================================
// 职责: 导入链路配置（大小/行数上限、会话有效期、批量大小、执行方式）
// 存储: config_kv 表，缺省值见 import_settings
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod import_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::ImportConfigReader;
pub use import_settings::{ExecutionMode, ImportSettings};
