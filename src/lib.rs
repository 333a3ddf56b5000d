//! Estoque API Library
//!
//! Stock control for a small retail store: shelves, products, categories,
//! employees, stock movements and sales reporting.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod navigation;
pub mod openapi;
pub mod reports;
pub mod services;
pub mod tracing;
pub mod validation;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService, SUPERVISOR_ROLE};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the services and the auth layer around one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            auth::AuthConfig::from_app_config(&config),
            db.clone(),
            event_sender.clone(),
        ));
        let services = handlers::AppServices::new(db.clone(), Arc::new(event_sender.clone()));
        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
        assert!(response.success);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes under `/api/v1`. Every group requires a live session; the
/// supervisor groups additionally check the role.
pub fn api_v1_routes() -> Router<AppState> {
    // Catalogue reads and product/category forms: any employee
    let catalogue = Router::new()
        .route(
            "/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/categories/:id",
            get(handlers::categories::get_category).put(handlers::categories::update_category),
        )
        .route("/shelves", get(handlers::shelves::list_shelves))
        .route("/shelves/:id", get(handlers::shelves::get_shelf))
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/products/low-stock", get(handlers::products::low_stock_products))
        .route(
            "/products/:id",
            get(handlers::products::get_product).put(handlers::products::update_product),
        )
        .with_auth();

    let stock = Router::new()
        .route(
            "/movements",
            get(handlers::movements::list_movements).post(handlers::movements::record_movement),
        )
        .route("/movements/transfer", post(handlers::movements::transfer_stock))
        .route(
            "/movements/transfers/:transfer_id",
            get(handlers::movements::get_transfer),
        )
        .route("/movements/:id", get(handlers::movements::get_movement))
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/navigation/resolve", get(handlers::navigation::resolve))
        .with_auth();

    // Shelf layout and deletions: supervisor only
    let catalogue_admin = Router::new()
        .route(
            "/categories/:id",
            delete(handlers::categories::deactivate_category),
        )
        .route("/shelves", post(handlers::shelves::create_shelf))
        .route(
            "/shelves/:id",
            put(handlers::shelves::update_shelf).delete(handlers::shelves::delete_shelf),
        )
        .route("/products/:id", delete(handlers::products::deactivate_product))
        .with_role(SUPERVISOR_ROLE);

    let employees = Router::new()
        .route(
            "/employees",
            get(handlers::employees::list_employees).post(handlers::employees::create_employee),
        )
        .route(
            "/employees/:id",
            get(handlers::employees::get_employee)
                .put(handlers::employees::update_employee)
                .delete(handlers::employees::deactivate_employee),
        )
        .with_role(SUPERVISOR_ROLE);

    let reports = Router::new()
        .route("/reports/sales", get(handlers::reports::sales_report))
        .route("/reports/sales/pdf", get(handlers::reports::sales_report_pdf))
        .with_role(SUPERVISOR_ROLE);

    Router::new()
        .route("/status", get(api_status))
        .merge(catalogue)
        .merge(stock)
        .merge(catalogue_admin)
        .merge(employees)
        .merge(reports)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    if config.should_allow_permissive_cors() {
        return base.allow_origin(tower_http::cors::Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    base.allow_origin(origins)
}

/// Full application router: API, auth, health, metrics and the OpenAPI document.
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", auth::auth_routes())
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .with_state(state)
        .layer(Extension(auth_service))
        .layer(tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .layer(cors)
        .layer(CompressionLayer::new())
}

async fn api_status(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "estoque-api",
        "store": state.config.store_name,
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "database health check failed");
            "unhealthy"
        }
    };

    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

async fn metrics_handler() -> Result<impl IntoResponse, errors::ServiceError> {
    let body = metrics::render()?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    ))
}
