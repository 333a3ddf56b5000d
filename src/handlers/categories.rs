use super::common::{created, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::category,
    errors::ServiceError,
    handlers::AppState,
    services::{
        categories::{CreateCategoryRequest, UpdateCategoryRequest},
        ListFilter,
    },
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
pub struct CategoryListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches the category name
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(CategoryListQuery),
    responses((status = 200, description = "Categories listed")),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<PaginatedResponse<category::Model>> {
    let page = PaginationParams::new(query.page, query.per_page).resolve(&state.config);
    let filter = ListFilter {
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (items, total) = state.services.categories.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category returned", body = category::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<category::Model> {
    let category = state.services.categories.get(id).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = category::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<category::Model>>), ServiceError> {
    let category = state.services.categories.create(payload).await?;
    Ok(created(category))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = category::Model),
        (status = 403, description = "Only supervisors may change `active`", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<category::Model> {
    let category = state.services.categories.update(&user, id, payload).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deactivated", body = category::Model),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn deactivate_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<category::Model> {
    let category = state.services.categories.deactivate(id).await?;
    Ok(Json(ApiResponse::success(category)))
}
