use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::common::{run_blocking, RequestContext};
use crate::api::ModuleFilter;
use crate::app::state::AppState;

// ==========================================
// 模块发现：可导入模块 / 导入顺序 / 模板 / 健康检查
// ==========================================

#[derive(Debug, Default, Deserialize)]
pub struct AvailableModulesQuery {
    pub domain: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOrderQuery {
    pub include_details: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    pub format: Option<String>,
}

/// GET /available-modules
pub async fn available_modules(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<AvailableModulesQuery>,
) -> Response {
    let filter = ModuleFilter {
        domain: query.domain,
        tag: query.tag,
        limit: query.limit,
    };
    let api = state.system_init_api.clone();
    ctx.respond(run_blocking(move || api.get_available_modules(&filter)).await)
}

/// GET /import-order
pub async fn import_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ImportOrderQuery>,
) -> Response {
    let view = state
        .system_init_api
        .get_import_order(query.include_details.unwrap_or(false));
    ctx.ok(view)
}

/// GET /module/{module_name}/template
///
/// 成功时直接返回文件字节（不走响应信封）
pub async fn download_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(module_name): Path<String>,
    Query(query): Query<TemplateQuery>,
) -> Response {
    let format = query.format.unwrap_or_else(|| "csv".to_string());
    match state.system_init_api.generate_template(&module_name, &format) {
        Ok(file) => {
            let disposition = format!("attachment; filename=\"{}\"", file.file_name);
            let length = file.bytes.len().to_string();
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, file.content_type.to_string()),
                    (CONTENT_DISPOSITION, disposition),
                    (CONTENT_LENGTH, length),
                ],
                file.bytes,
            )
                .into_response()
        }
        Err(err) => ctx.error(err),
    }
}

/// GET /health-status（不返回错误）
pub async fn health_status(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let api = state.system_init_api.clone();
    match tokio::task::spawn_blocking(move || api.health_status()).await {
        Ok(view) => ctx.ok(view),
        Err(e) => {
            tracing::error!(error = %e, "健康检查任务异常");
            ctx.ok(serde_json::json!({ "isHealthy": false }))
        }
    }
}
