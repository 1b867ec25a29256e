use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use super::common::{run_blocking, RequestContext};
use crate::api::DashboardOptions;
use crate::app::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub include_history: Option<bool>,
    pub history_limit: Option<usize>,
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let options = DashboardOptions {
        include_history: query.include_history.unwrap_or(false),
        history_limit: query.history_limit,
    };
    let api = state.dashboard_api.clone();
    ctx.respond(run_blocking(move || api.get_dashboard_data(options)).await)
}
