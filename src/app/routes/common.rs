use axum::extract::FromRequestParts;
use axum::http::header::{HeaderMap, USER_AGENT};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::convert::Infallible;

use crate::api::{ApiError, ApiResult};
use crate::domain::job::ImportContext;

// ==========================================
// 公共工具：请求上下文、响应信封、错误映射、阻塞调用
// ==========================================

/// 信封协议版本
pub const ENVELOPE_VERSION: &str = "1.0";

/// 未携带 x-user-id 时的操作人
pub const ANONYMOUS_USER: &str = "anonymous";

/// 响应元信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

/// 错误体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// 错误代码
    pub code: &'static str,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// 统一响应信封
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub meta: ResponseMeta,
}

// ==========================================
// RequestContext - 从请求头提取的调用方信息
// ==========================================
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub import_context: ImportContext,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = header_value(headers, "x-user-id").unwrap_or_else(|| ANONYMOUS_USER.to_string());
        // x-forwarded-for 可能是逗号分隔的代理链，取最前面的客户端地址
        let ip_address = header_value(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()));

        Self {
            request_id: header_value(headers, "x-request-id")
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            import_context: ImportContext {
                user_id,
                user_name: header_value(headers, "x-user-name"),
                ip_address,
                user_agent: header_value(headers, USER_AGENT.as_str()),
            },
        }
    }

    fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            request_id: self.request_id.clone(),
            timestamp: Utc::now(),
            version: ENVELOPE_VERSION,
        }
    }

    /// 成功响应（200）
    pub fn ok<T: Serialize>(&self, data: T) -> Response {
        let body = Envelope {
            success: true,
            data: Some(data),
            error: None,
            meta: self.meta(),
        };
        (StatusCode::OK, Json(body)).into_response()
    }

    /// 错误响应（状态码取自 ApiError）
    pub fn error(&self, err: ApiError) -> Response {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(request_id = %self.request_id, code = err.error_code(), error = %err, "请求处理失败");
        } else {
            tracing::debug!(request_id = %self.request_id, code = err.error_code(), error = %err, "请求被拒绝");
        }

        let body: Envelope<()> = Envelope {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: err.error_code(),
                message: err.to_string(),
                details: error_details(&err),
            }),
            meta: self.meta(),
        };
        (status, Json(body)).into_response()
    }

    /// 按结果选择成功 / 错误响应
    pub fn respond<T: Serialize>(&self, result: ApiResult<T>) -> Response {
        match result {
            Ok(data) => self.ok(data),
            Err(err) => self.error(err),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// 结构化错误详情（前端据此定位问题）
fn error_details(err: &ApiError) -> Option<serde_json::Value> {
    match err {
        ApiError::FileTooLarge { size, max } => Some(serde_json::json!({
            "size": size,
            "maxSize": max,
        })),
        ApiError::PayloadTooLarge(max) => Some(serde_json::json!({ "maxSize": max })),
        ApiError::TooManyRows { rows, max } => Some(serde_json::json!({
            "rows": rows,
            "maxRows": max,
        })),
        ApiError::ValidationBlocked {
            session_id,
            error_rows,
            warnings,
        } => Some(serde_json::json!({
            "sessionId": session_id,
            "errorRows": error_rows,
            "warnings": warnings,
        })),
        ApiError::RollbackNotEligible { job_id, status } => Some(serde_json::json!({
            "jobId": job_id,
            "status": status,
        })),
        _ => None,
    }
}

/// 在阻塞线程池上执行核心调用（SQLite 与文件解析均为同步 IO）
pub async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalError(format!("阻塞任务执行失败: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("u-1"));
        headers.insert("x-user-name", HeaderValue::from_static("alice@example.com"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-request-id", HeaderValue::from_static("req-42"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "req-42");
        assert_eq!(ctx.import_context.user_id, "u-1");
        assert_eq!(ctx.import_context.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(ctx.import_context.user_agent.is_none());
    }

    #[test]
    fn test_context_defaults() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        assert_eq!(ctx.import_context.user_id, ANONYMOUS_USER);
        assert!(!ctx.request_id.is_empty());
    }

    #[test]
    fn test_error_response_status() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        let resp = ctx.error(ApiError::ModuleNotFound("ghost".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = ctx.error(ApiError::PayloadTooLarge(10));
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
