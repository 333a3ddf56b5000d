use super::common::{created, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::product,
    errors::ServiceError,
    handlers::AppState,
    services::products::{CreateProductRequest, ProductFilter, UpdateProductRequest},
    ApiResponse, ApiResult, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    Extension,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches name, code or barcode
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub shelf_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses((status = 200, description = "Products listed")),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<PaginatedResponse<product::Model>> {
    let page = PaginationParams::new(query.page, query.per_page).resolve(&state.config);
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
        shelf_id: query.shelf_id,
        include_inactive: query.include_inactive,
    };
    let (items, total) = state.services.products.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses((status = 200, description = "Active products below their minimum stock")),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn low_stock_products(State(state): State<AppState>) -> ApiResult<Vec<product::Model>> {
    let products = state.services.products.low_stock().await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product returned", body = product::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.products.get(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = product::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product code already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let product = state.services.products.create(payload).await?;
    Ok(created(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = product::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only supervisors may change `active`", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product code already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    let product = state.services.products.update(&user, id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deactivated", body = product::Model),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.products.deactivate(id).await?;
    Ok(Json(ApiResponse::success(product)))
}
