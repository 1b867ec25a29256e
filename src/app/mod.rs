// ==========================================
// 系统初始化导入中心 - 应用层
// ==========================================
// 职责: HTTP 集成（axum），连接外部调用方与 API 层
// ==========================================

pub mod routes;
pub mod state;

// 重导出
pub use routes::{router, API_PREFIX};
pub use state::{get_default_db_path, AppState};
