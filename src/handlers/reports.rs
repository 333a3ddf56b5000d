use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    reports::{render_sales_report_blocking, PdfOptions},
    services::reports::{ReportQuery, SalesReport},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Json, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/v1/reports/sales",
    params(ReportQuery),
    responses(
        (status = 200, description = "Sales in the period", body = SalesReport),
        (status = 400, description = "Missing or reversed period", body = crate::errors::ErrorResponse),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
/// Sales in a period
///
/// Sales are the exit movements recorded in the period. The exit half of a
/// stock transfer only moves units from the warehouse to the shop (or back)
/// and is not counted as a sale.
pub async fn sales_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<SalesReport> {
    let (start, end) = query.period()?;
    let report = state
        .services
        .reports
        .sales_report(user.employee_id, start, end)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/sales/pdf",
    params(ReportQuery),
    responses(
        (status = 200, description = "Sales report as an A4 PDF attachment", content_type = "application/pdf"),
        (status = 400, description = "Missing or reversed period", body = crate::errors::ErrorResponse),
        (status = 403, description = "Supervisor only", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
/// Sales in a period as PDF
///
/// Same lines and summary as the JSON report, so exits that belong to a
/// stock transfer are not counted as sales here either.
pub async fn sales_report_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServiceError> {
    let (start, end) = query.period()?;
    let report = state
        .services
        .reports
        .sales_report(user.employee_id, start, end)
        .await?;

    let options = PdfOptions {
        store_name: state.config.store_name.clone(),
        currency: state.config.currency.clone(),
    };
    let bytes = render_sales_report_blocking(report, options).await?;
    info!(size = bytes.len(), "sales report PDF rendered");

    let filename = format!(
        "attachment; filename=\"relatorio-vendas-{}-{}.pdf\"",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    );
    let disposition = HeaderValue::from_str(&filename)
        .map_err(|e| ServiceError::InternalError(format!("invalid header: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
