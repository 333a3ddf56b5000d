use crate::{
    auth::AuthUser,
    navigation::{self, NavigationQuery, NavigationTarget},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Json, Query},
    Extension,
};

#[utoipa::path(
    get,
    path = "/api/v1/navigation/resolve",
    params(NavigationQuery),
    responses((status = 200, description = "Allow-listed page and sanitised ids", body = NavigationTarget)),
    security(("bearer_auth" = [])),
    tag = "navigation"
)]
pub async fn resolve(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NavigationQuery>,
) -> ApiResult<NavigationTarget> {
    Ok(Json(ApiResponse::success(navigation::resolve(&query, user.role))))
}
