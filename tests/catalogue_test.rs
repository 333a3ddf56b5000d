//! Shelves, categories and products: uniqueness rules and deletion.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{response_json, TestApp};
use estoque_api::{entities::shelf, errors::ServiceError};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;
use uuid::Uuid;

async fn shelves_numbered(app: &TestApp, number: &str) -> u64 {
    shelf::Entity::find()
        .filter(shelf::Column::Number.eq(number))
        .count(&*app.state.db)
        .await
        .unwrap()
}

fn shelf_row(number: &str, active: bool) -> shelf::ActiveModel {
    let now = Utc::now();
    shelf::ActiveModel {
        id: Set(Uuid::new_v4()),
        number: Set(number.to_string()),
        description: Set(None),
        active: Set(active),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[tokio::test]
async fn duplicate_active_shelf_number_conflicts() {
    let app = TestApp::new().await;

    let response = app
        .as_supervisor(
            Method::POST,
            "/api/v1/shelves",
            Some(json!({ "number": "A-01", "description": "Entrada" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "A-01" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("shelf number 'A-01' already exists"));
    assert_eq!(shelves_numbered(&app, "A-01").await, 1);
}

#[tokio::test]
async fn unique_index_rejects_a_second_active_shelf() {
    let app = TestApp::new().await;
    let db = &*app.state.db;

    shelf_row("E-05", true).insert(db).await.unwrap();

    // Straight to the table, past the service's own lookup.
    let err = shelf_row("E-05", true).insert(db).await.unwrap_err();
    assert!(matches!(
        ServiceError::from_constraint(err, "shelf"),
        ServiceError::Conflict(_)
    ));

    // Only active rows take part in the index.
    shelf_row("E-05", false).insert(db).await.unwrap();
    assert_eq!(shelves_numbered(&app, "E-05").await, 2);

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "E-05" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(shelves_numbered(&app, "E-05").await, 2);
}

#[tokio::test]
async fn one_character_shelf_number_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "F" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(shelves_numbered(&app, "F").await, 0);
}

#[tokio::test]
async fn shelves_are_managed_by_supervisors() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(Method::POST, "/api/v1/shelves", Some(json!({ "number": "G-07" })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(shelves_numbered(&app, "G-07").await, 0);

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "G-07" })))
        .await;
    let uri = format!(
        "/api/v1/shelves/{}",
        response_json(response).await["data"]["id"].as_str().unwrap()
    );

    for body in [json!({ "active": false }), json!({ "description": "Fundos" })] {
        let response = app.as_staff(Method::PUT, &uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let response = app.as_staff(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["active"], true);
    assert!(body["data"]["description"].is_null());
}

#[tokio::test]
async fn inactive_shelf_frees_its_number() {
    let app = TestApp::new().await;

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "B-02" })))
        .await;
    let first = response_json(response).await["data"].clone();

    let response = app
        .as_supervisor(
            Method::PUT,
            &format!("/api/v1/shelves/{}", first["id"].as_str().unwrap()),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "B-02" })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn shelf_in_use_cannot_be_deleted() {
    let app = TestApp::new().await;

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "C-03" })))
        .await;
    let shelf = response_json(response).await["data"].clone();
    let shelf_id = shelf["id"].as_str().unwrap();

    let response = app
        .as_supervisor(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "code": "ARR10",
                "name": "Arroz",
                "cost_price": "4.50",
                "sale_price": "8.25",
                "shelf_id": shelf_id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .as_supervisor(Method::DELETE, &format!("/api/v1/shelves/{}", shelf_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .as_supervisor(Method::POST, "/api/v1/shelves", Some(json!({ "number": "D-04" })))
        .await;
    let empty = response_json(response).await["data"].clone();
    let response = app
        .as_supervisor(
            Method::DELETE,
            &format!("/api/v1/shelves/{}", empty["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn product_codes_are_normalized_and_unique() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "code": "fei11",
                "name": "Feijão",
                "cost_price": "5.00",
                "sale_price": "9.50",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["code"], "FEI11");
    assert_eq!(body["data"]["shop_quantity"], 0);

    let response = app
        .as_staff(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "code": "FEI11",
                "name": "Outro feijão",
                "cost_price": "5.00",
                "sale_price": "9.50",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_product_code_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "code": "AB123",
                "name": "Errado",
                "cost_price": "1.00",
                "sale_price": "2.00",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_search_matches_code_and_name() {
    let app = TestApp::new().await;
    app.create_product("BIS12", 1, 1, 0).await;
    app.create_product("SUC13", 1, 1, 0).await;

    let response = app
        .as_staff(Method::GET, "/api/v1/products?search=bis", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["code"], "BIS12");
}

#[tokio::test]
async fn categories_are_created_and_listed() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Mercearia" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.as_staff(Method::GET, "/api/v1/categories", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Mercearia");
}

#[tokio::test]
async fn staff_cannot_toggle_product_active_flag() {
    let app = TestApp::new().await;
    let product = app.create_product("TRI14", 1, 1, 0).await;
    let uri = format!("/api/v1/products/{}", product["id"].as_str().unwrap());

    let response = app
        .as_staff(Method::PUT, &uri, Some(json!({ "active": false })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Forbidden: access denied");

    // Other fields, and echoing the current flag, stay open to staff.
    let response = app
        .as_staff(
            Method::PUT,
            &uri,
            Some(json!({ "name": "Trigo 1kg", "active": true })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Trigo 1kg");
    assert_eq!(body["data"]["active"], true);

    let response = app
        .as_supervisor(Method::PUT, &uri, Some(json!({ "active": false })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["active"], false);

    // Reactivation is the supervisor's call as well.
    let response = app
        .as_staff(Method::PUT, &uri, Some(json!({ "active": true })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn staff_cannot_toggle_category_active_flag() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Limpeza" })),
        )
        .await;
    let uri = format!(
        "/api/v1/categories/{}",
        response_json(response).await["data"]["id"].as_str().unwrap()
    );

    let response = app
        .as_staff(Method::PUT, &uri, Some(json!({ "active": false })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.as_staff(Method::GET, &uri, None).await;
    assert_eq!(response_json(response).await["data"]["active"], true);

    let response = app
        .as_supervisor(Method::PUT, &uri, Some(json!({ "active": false })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn page_numbers_beyond_the_cap_return_an_empty_page() {
    let app = TestApp::new().await;
    app.create_product("MIL15", 1, 1, 0).await;

    let response = app
        .as_staff(
            Method::GET,
            "/api/v1/products?page=18446744073709551615&per_page=100",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["page"], 1_000_000);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
}
