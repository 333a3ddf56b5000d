//! Sales report over exits, JSON and PDF.

mod common;

use std::str::FromStr;

use axum::{
    body,
    http::{header, Method, StatusCode},
};
use chrono::{Duration, SecondsFormat, Utc};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

fn period_around_now() -> String {
    let start = (Utc::now() - Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let end = (Utc::now() + Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("start={}&end={}", start, end)
}

async fn seed_activity(app: &TestApp) {
    let product = app.create_product("ARR30", 10, 10, 0).await;
    let product_id = product["id"].clone();

    // Sale of 3 units at 11.50
    app.as_staff(
        Method::POST,
        "/api/v1/movements",
        Some(json!({
            "product_id": product_id,
            "movement_type": "exit",
            "location": "shop",
            "quantity": 3
        })),
    )
    .await;
    // Entries and transfers are not sales
    app.as_staff(
        Method::POST,
        "/api/v1/movements",
        Some(json!({
            "product_id": product_id,
            "movement_type": "entry",
            "location": "warehouse",
            "quantity": 8
        })),
    )
    .await;
    app.as_staff(
        Method::POST,
        "/api/v1/movements/transfer",
        Some(json!({
            "product_id": product_id,
            "from": "warehouse",
            "quantity": 4
        })),
    )
    .await;
}

#[tokio::test]
async fn report_counts_only_exits_outside_transfers() {
    let app = TestApp::new().await;
    seed_activity(&app).await;

    let uri = format!("/api/v1/reports/sales?{}", period_around_now());
    let response = app.as_supervisor(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let summary = &body["data"]["summary"];
    assert_eq!(summary["line_count"], 1);
    assert_eq!(summary["units_sold"], 3);
    assert_eq!(decimal(&summary["total_revenue"]), dec!(34.50));
    assert_eq!(decimal(&summary["total_cost"]), dec!(13.50));
    assert_eq!(decimal(&summary["gross_profit"]), dec!(21.00));

    let line = &body["data"]["lines"][0];
    assert_eq!(line["product_code"], "ARR30");
    assert_eq!(line["employee_name"], "Balconista");
    assert_eq!(line["location"], "shop");
}

#[tokio::test]
async fn report_outside_the_period_is_empty() {
    let app = TestApp::new().await;
    seed_activity(&app).await;

    let response = app
        .as_supervisor(
            Method::GET,
            "/api/v1/reports/sales?start_date=2000-01-01&end_date=2000-12-31",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["summary"]["line_count"], 0);
    assert_eq!(decimal(&body["data"]["summary"]["total_revenue"]), Decimal::ZERO);
}

#[tokio::test]
async fn reversed_or_missing_period_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .as_supervisor(
            Method::GET,
            "/api/v1/reports/sales?start_date=2024-02-01&end_date=2024-01-01",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .as_supervisor(Method::GET, "/api/v1/reports/sales", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pdf_export_is_an_attachment() {
    let app = TestApp::new().await;
    seed_activity(&app).await;

    let uri = format!("/api/v1/reports/sales/pdf?{}", period_around_now());
    let response = app.as_supervisor(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"relatorio-vendas-"));

    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn dashboard_reflects_recorded_activity() {
    let app = TestApp::new().await;
    seed_activity(&app).await;

    let response = app.as_staff(Method::GET, "/api/v1/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["active_products"], 1);
    // 10 - 3 + 4 in the shop, 10 + 8 - 4 in the warehouse
    assert_eq!(data["shop_units"], 11);
    assert_eq!(data["warehouse_units"], 14);
    assert_eq!(data["movements_today"], 4);
}
