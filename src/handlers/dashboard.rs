use crate::{
    handlers::AppState, services::dashboard::DashboardSummary, ApiResponse, ApiResult,
};
use axum::extract::{Json, State};

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses((status = 200, description = "Stock overview", body = DashboardSummary)),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    let summary = state.services.dashboard.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}
