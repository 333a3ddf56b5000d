use super::common::{created, PaginationParams};
use crate::{
    entities::shelf,
    errors::ServiceError,
    handlers::AppState,
    services::{
        shelves::{CreateShelfRequest, UpdateShelfRequest},
        ListFilter,
    },
    ApiResponse, ApiResult, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShelfListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches number or description
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/shelves",
    params(ShelfListQuery),
    responses((status = 200, description = "Shelves listed")),
    security(("bearer_auth" = [])),
    tag = "shelves"
)]
pub async fn list_shelves(
    State(state): State<AppState>,
    Query(query): Query<ShelfListQuery>,
) -> ApiResult<PaginatedResponse<shelf::Model>> {
    let page = PaginationParams::new(query.page, query.per_page).resolve(&state.config);
    let filter = ListFilter {
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (items, total) = state.services.shelves.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shelves/:id",
    params(("id" = Uuid, Path, description = "Shelf ID")),
    responses(
        (status = 200, description = "Shelf returned", body = shelf::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shelves"
)]
pub async fn get_shelf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<shelf::Model> {
    let shelf = state.services.shelves.get(id).await?;
    Ok(Json(ApiResponse::success(shelf)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shelves",
    request_body = CreateShelfRequest,
    responses(
        (status = 201, description = "Shelf created", body = shelf::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shelf number already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shelves"
)]
pub async fn create_shelf(
    State(state): State<AppState>,
    Json(payload): Json<CreateShelfRequest>,
) -> Result<(StatusCode, Json<ApiResponse<shelf::Model>>), ServiceError> {
    let shelf = state.services.shelves.create(payload).await?;
    Ok(created(shelf))
}

#[utoipa::path(
    put,
    path = "/api/v1/shelves/:id",
    params(("id" = Uuid, Path, description = "Shelf ID")),
    request_body = UpdateShelfRequest,
    responses(
        (status = 200, description = "Shelf updated", body = shelf::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shelf number already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shelves"
)]
pub async fn update_shelf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShelfRequest>,
) -> ApiResult<shelf::Model> {
    let shelf = state.services.shelves.update(id, payload).await?;
    Ok(Json(ApiResponse::success(shelf)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shelves/:id",
    params(("id" = Uuid, Path, description = "Shelf ID")),
    responses(
        (status = 204, description = "Shelf deleted"),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Products still reference the shelf", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shelves"
)]
pub async fn delete_shelf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.shelves.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
