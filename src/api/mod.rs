// ==========================================
// 系统初始化导入中心 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 HTTP 路由调用
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod system_init_api;

// 重导出核心类型
pub use dashboard_api::{DashboardApi, DashboardData, DashboardOptions, Recommendation};
pub use error::{ApiError, ApiResult};
pub use system_init_api::{
    AvailableModule, AvailableModulesView, HealthStatusView, ImportOrderView, ModuleFilter,
    SystemInitApi,
};
