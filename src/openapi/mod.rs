use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Estoque API",
        version = "0.1.0",
        description = r#"
# Estoque API

Stock control for a small store with two stock locations, the shop floor and
the warehouse.

## Authentication

Log in at `POST /auth/login` with phone and password. Send the returned token
as `Authorization: Bearer <token>`. Tokens are bound to a server-side session;
logging out or deactivating the employee invalidates them at once.

## Roles

Employee management, the financial report, shelf create/update and deletions
are restricted to supervisors. So is changing the `active` flag of a product
or category through its update endpoint. Other employees get `403` with the
message "access denied".

## Sales report

The report counts exit movements as sales. Exits written by a stock transfer
are not sales and are left out of both the JSON and the PDF report.

## Pagination

List endpoints accept `page` (from 1, capped at 1 000 000) and `per_page`
(capped at the configured maximum) and return `items`, `total`, `page`, `per_page` and `total_pages`.
"#
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "auth", description = "Login and sessions"),
        (name = "employees", description = "Employee management (supervisor only)"),
        (name = "categories", description = "Product categories"),
        (name = "shelves", description = "Shelves"),
        (name = "products", description = "Products and stock levels"),
        (name = "movements", description = "Stock entries, exits and transfers"),
        (name = "reports", description = "Financial reports (supervisor only)"),
        (name = "dashboard", description = "Stock overview"),
        (name = "navigation", description = "Front-end page resolution")
    ),
    paths(
        crate::auth::login_handler,
        crate::auth::logout_handler,
        crate::auth::me_handler,

        crate::handlers::employees::list_employees,
        crate::handlers::employees::get_employee,
        crate::handlers::employees::create_employee,
        crate::handlers::employees::update_employee,
        crate::handlers::employees::deactivate_employee,

        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::deactivate_category,

        crate::handlers::shelves::list_shelves,
        crate::handlers::shelves::get_shelf,
        crate::handlers::shelves::create_shelf,
        crate::handlers::shelves::update_shelf,
        crate::handlers::shelves::delete_shelf,

        crate::handlers::products::list_products,
        crate::handlers::products::low_stock_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::deactivate_product,

        crate::handlers::movements::list_movements,
        crate::handlers::movements::get_movement,
        crate::handlers::movements::record_movement,
        crate::handlers::movements::transfer_stock,
        crate::handlers::movements::get_transfer,

        crate::handlers::reports::sales_report,
        crate::handlers::reports::sales_report_pdf,

        crate::handlers::dashboard::dashboard,
        crate::handlers::navigation::resolve,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            crate::auth::LoginRequest,
            crate::auth::LoginResponse,
            crate::services::employees::EmployeeView,
            crate::services::employees::CreateEmployeeRequest,
            crate::services::employees::UpdateEmployeeRequest,
            crate::entities::EmployeeRole,

            crate::entities::category::Model,
            crate::services::categories::CreateCategoryRequest,
            crate::services::categories::UpdateCategoryRequest,

            crate::entities::shelf::Model,
            crate::services::shelves::CreateShelfRequest,
            crate::services::shelves::UpdateShelfRequest,

            crate::entities::product::Model,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,

            crate::entities::movement::Model,
            crate::entities::MovementType,
            crate::entities::StockLocation,
            crate::services::movements::RecordMovementRequest,
            crate::services::movements::TransferRequest,
            crate::services::movements::MovementOutcome,
            crate::services::movements::TransferOutcome,
            crate::services::movements::MovementDetail,

            crate::services::reports::SalesReport,
            crate::services::reports::SalesSummary,
            crate::services::reports::SalesLine,
            crate::services::dashboard::DashboardSummary,
            crate::services::dashboard::ShelfSummary,
            crate::navigation::Page,
            crate::navigation::NavigationTarget,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_paths_and_bearer_scheme() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Estoque API"));
        assert!(json.contains("/api/v1/movements/transfer"));
        assert!(json.contains("/auth/login"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn report_operations_say_transfers_are_not_sales() {
        let doc = ApiDocV1::openapi();
        for path in ["/api/v1/reports/sales", "/api/v1/reports/sales/pdf"] {
            let op = doc
                .paths
                .paths
                .get(path)
                .and_then(|item| item.get.as_ref())
                .unwrap_or_else(|| panic!("{} missing", path));
            let text = format!(
                "{} {}",
                op.summary.as_deref().unwrap_or_default(),
                op.description.as_deref().unwrap_or_default()
            );
            assert!(text.contains("stock transfer"), "{}: {}", path, text);
        }
    }
}
