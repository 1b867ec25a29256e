use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use super::common::{run_blocking, RequestContext};
use crate::api::ApiError;
use crate::app::state::AppState;
use crate::domain::job::ImportOptions;
use crate::domain::types::FileType;
use crate::importer::UploadedFile;

// ==========================================
// 导入链路：校验 / 执行 / 状态 / 回滚 / 历史
// ==========================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateQuery {
    pub skip_warnings: Option<bool>,
    /// 显式指定 csv / excel，缺省按扩展名推断
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub session_id: String,
    #[serde(default)]
    pub options: ImportOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

fn multipart_error(err: MultipartError, transport_limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(transport_limit)
    } else {
        ApiError::InvalidInput(format!("multipart 解析失败: {}", err.body_text()))
    }
}

/// 取出第一个带文件名的字段
async fn read_upload(
    mut multipart: Multipart,
    transport_limit: usize,
) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, transport_limit))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, transport_limit))?;
        return Ok(UploadedFile::new(&file_name, bytes.to_vec()));
    }
    Err(ApiError::InvalidInput("请求中未包含文件".to_string()))
}

/// POST /module/{module_name}/validate（multipart，单文件）
pub async fn validate_file(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(module_name): Path<String>,
    Query(query): Query<ValidateQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            return ctx.error(ApiError::InvalidInput(rejection.body_text()));
        }
    };

    let transport_limit = super::upload_body_limit(&state.settings);
    let mut file = match read_upload(multipart, transport_limit).await {
        Ok(file) => file,
        Err(err) => return ctx.error(err),
    };

    if let Some(raw) = query.file_type.as_deref() {
        match FileType::from_str(raw) {
            Some(file_type) => file.file_type = Some(file_type),
            None => return ctx.error(ApiError::UnsupportedFormat(raw.to_string())),
        }
    }

    let api = state.system_init_api.clone();
    let skip_warnings = query.skip_warnings.unwrap_or(false);
    let import_ctx = ctx.import_context.clone();
    let result = run_blocking(move || {
        api.validate_file(&module_name, &file, skip_warnings, &import_ctx)
    })
    .await;
    ctx.respond(result)
}

/// POST /module/{module_name}/import
pub async fn execute_import(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(module_name): Path<String>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return ctx.error(ApiError::InvalidInput(rejection.body_text())),
    };

    let api = state.system_init_api.clone();
    let import_ctx = ctx.import_context.clone();
    let result = run_blocking(move || {
        api.import_data(&module_name, &request.session_id, request.options, &import_ctx)
    })
    .await;
    ctx.respond(result)
}

/// GET /module/{module_name}/status/{job_id}
pub async fn import_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((module_name, job_id)): Path<(String, String)>,
) -> Response {
    let api = state.system_init_api.clone();
    ctx.respond(run_blocking(move || api.get_import_status(&module_name, &job_id)).await)
}

/// DELETE /module/{module_name}/rollback/{job_id}
pub async fn rollback(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((module_name, job_id)): Path<(String, String)>,
) -> Response {
    let api = state.system_init_api.clone();
    let import_ctx = ctx.import_context.clone();
    ctx.respond(run_blocking(move || api.rollback(&module_name, &job_id, &import_ctx)).await)
}

/// GET /module/{module_name}/history
pub async fn import_history(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(module_name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let api = state.system_init_api.clone();
    ctx.respond(run_blocking(move || api.get_import_history(&module_name, query.limit)).await)
}
