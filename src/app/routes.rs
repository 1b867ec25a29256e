// ==========================================
// 系统初始化导入中心 - HTTP 路由
// ==========================================
// 挂载点: /api/system-init
// 响应: 统一信封 {success, data|error, meta}；模板下载直接返回文件
// ==========================================

pub mod common;
pub mod dashboard;
pub mod discovery;
pub mod import;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app::state::AppState;
use crate::config::ImportSettings;

/// 路由前缀
pub const API_PREFIX: &str = "/api/system-init";

/// multipart 边界与字段头的余量
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// 上传接口的请求体上限（文件上限 + multipart 余量）
pub fn upload_body_limit(settings: &ImportSettings) -> usize {
    settings.max_file_size_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// 构建完整路由
pub fn router(state: AppState) -> Router {
    let upload_limit = upload_body_limit(&state.settings);

    let api = Router::new()
        .route("/available-modules", get(discovery::available_modules))
        .route("/import-order", get(discovery::import_order))
        .route("/health-status", get(discovery::health_status))
        .route("/dashboard", get(dashboard::dashboard))
        .route(
            "/module/{module_name}/template",
            get(discovery::download_template),
        )
        .route(
            "/module/{module_name}/validate",
            post(import::validate_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/module/{module_name}/import", post(import::execute_import))
        .route(
            "/module/{module_name}/status/{job_id}",
            get(import::import_status),
        )
        .route(
            "/module/{module_name}/rollback/{job_id}",
            delete(import::rollback),
        )
        .route("/module/{module_name}/history", get(import::import_history));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
