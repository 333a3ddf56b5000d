#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use estoque_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    services::employees::CreateEmployeeRequest,
    entities::EmployeeRole,
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const SUPERVISOR_PHONE: &str = "11999990000";
pub const STAFF_PHONE: &str = "11988887777";
pub const PASSWORD: &str = "segredo123";

/// Helper harness backed by a throwaway SQLite file with a supervisor and a
/// staff employee already logged in.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub supervisor_token: String,
    pub staff_token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("estoque_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "k9Qz_w2Lr7Vt8Xn4Mb3Hj6Gf1Ds5Pa0Ey".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);

        state
            .auth
            .bootstrap_supervisor("Supervisora", SUPERVISOR_PHONE, PASSWORD)
            .await
            .expect("bootstrap supervisor");
        state
            .services
            .employees
            .create(CreateEmployeeRequest {
                name: "Balconista".to_string(),
                phone: STAFF_PHONE.to_string(),
                password: PASSWORD.to_string(),
                role: EmployeeRole::Staff,
            })
            .await
            .expect("seed staff employee");

        let router = estoque_api::app_router(state.clone());

        let mut app = Self {
            router,
            state,
            supervisor_token: String::new(),
            staff_token: String::new(),
            _event_task: event_task,
            _dir: dir,
        };
        app.supervisor_token = app.login(SUPERVISOR_PHONE, PASSWORD).await;
        app.staff_token = app.login(STAFF_PHONE, PASSWORD).await;
        app
    }

    /// Logs in through the HTTP endpoint and returns the bearer token.
    pub async fn login(&self, phone: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "phone": phone, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login should succeed");
        let body = response_json(response).await;
        body["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn as_supervisor(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.supervisor_token))
            .await
    }

    pub async fn as_staff(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.staff_token)).await
    }

    /// Creates a product through the API and returns its `data` payload.
    pub async fn create_product(&self, code: &str, shop: i32, warehouse: i32, min: i32) -> Value {
        let response = self
            .as_supervisor(
                Method::POST,
                "/api/v1/products",
                Some(json!({
                    "code": code,
                    "name": format!("Produto {}", code),
                    "cost_price": "4.50",
                    "sale_price": "11.50",
                    "shop_quantity": shop,
                    "warehouse_quantity": warehouse,
                    "min_quantity": min,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "product created");
        response_json(response).await["data"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
