use super::common::{created, PaginationParams};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        employees::{CreateEmployeeRequest, EmployeeView, UpdateEmployeeRequest},
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
pub struct EmployeeListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches name or phone
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeListQuery),
    responses(
        (status = 200, description = "Employees listed"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeListQuery>,
) -> ApiResult<PaginatedResponse<EmployeeView>> {
    let page = PaginationParams::new(query.page, query.per_page).resolve(&state.config);
    let filter = ListFilter {
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (items, total) = state.services.employees.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/:id",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee returned", body = EmployeeView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<EmployeeView> {
    let employee = state.services.employees.get(id).await?;
    Ok(Json(ApiResponse::success(employee)))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = EmployeeView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Phone already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EmployeeView>>), ServiceError> {
    let employee = state.services.employees.create(payload).await?;
    Ok(created(employee))
}

#[utoipa::path(
    put,
    path = "/api/v1/employees/:id",
    params(("id" = Uuid, Path, description = "Employee ID")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Phone already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> ApiResult<EmployeeView> {
    let employee = state
        .services
        .employees
        .update(user.employee_id, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(employee)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employees/:id",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deactivated and signed out", body = EmployeeView),
        (status = 400, description = "Cannot deactivate yourself", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
pub async fn deactivate_employee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<EmployeeView> {
    let employee = state
        .services
        .employees
        .deactivate(user.employee_id, id)
        .await?;
    Ok(Json(ApiResponse::success(employee)))
}
