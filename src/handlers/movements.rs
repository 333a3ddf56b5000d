use super::common::{created, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::{movement, MovementType, StockLocation},
    errors::ServiceError,
    handlers::AppState,
    services::movements::{
        MovementDetail, MovementFilter, MovementOutcome, RecordMovementRequest, TransferOutcome,
        TransferRequest,
    },
    ApiResponse, ApiResult, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Ignored unless shaped like a v4 UUID
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub location: Option<StockLocation>,
    /// RFC 3339, inclusive
    pub start: Option<DateTime<Utc>>,
    /// RFC 3339, inclusive
    pub end: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementListQuery),
    responses(
        (status = 200, description = "Movements listed, newest first"),
        (status = 400, description = "start after end", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> ApiResult<PaginatedResponse<movement::Model>> {
    let page = PaginationParams::new(query.page, query.per_page).resolve(&state.config);
    let filter = MovementFilter {
        product_id: query.product_id,
        movement_type: query.movement_type,
        location: query.location,
        start: query.start,
        end: query.end,
    };
    let (items, total) = state.services.movements.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/movements/:id",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement returned", body = MovementDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn get_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MovementDetail> {
    let detail = state.services.movements.get(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

#[utoipa::path(
    post,
    path = "/api/v1/movements",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = MovementOutcome),
        (status = 400, description = "Invalid request or inactive product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MovementOutcome>>), ServiceError> {
    let outcome = state.services.movements.record(&user, payload).await?;
    Ok(created(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/movements/transfer",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer completed", body = TransferOutcome),
        (status = 400, description = "Invalid request or inactive product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<TransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferOutcome>>), ServiceError> {
    let outcome = state.services.movements.transfer(&user, payload).await?;
    Ok(created(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/movements/transfers/:transfer_id",
    params(("transfer_id" = Uuid, Path, description = "Transfer ID shared by both movements")),
    responses(
        (status = 200, description = "Exit and entry of the transfer"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> ApiResult<Vec<movement::Model>> {
    let pair = state.services.movements.transfer_pair(transfer_id).await?;
    Ok(Json(ApiResponse::success(pair)))
}
