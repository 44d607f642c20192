//! Integration tests for stock returns.
//!
//! Tests cover:
//! - Submitting a return and the immediate stock draw
//! - Approval crediting the central warehouse
//! - Rejection restoring the distributor's stock
//! - One decision per return
//! - Tenant scoping and list filters

mod common;

use axum::{body, http::Method, response::Response};
use common::{DistributorFixture, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

async fn stock_quantity(app: &TestApp, token: &str, stock_id: &str) -> i64 {
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/my-stock/{}", stock_id),
            None,
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    body["data"]["quantity"].as_i64().expect("stock quantity")
}

async fn warehouse_quantity(app: &TestApp, product_id: &str) -> i64 {
    let response = app
        .admin_request(Method::GET, "/api/v1/warehouse-stock?limit=100", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    body["data"]["items"]
        .as_array()
        .expect("stock items")
        .iter()
        .find(|row| row["product_id"] == product_id)
        .map(|row| row["quantity"].as_i64().expect("quantity"))
        .unwrap_or(0)
}

async fn submit_return(
    app: &TestApp,
    dist: &DistributorFixture,
    stock_id: &str,
    quantity: i32,
    reason: &str,
) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "stock_id": stock_id,
                "quantity": quantity,
                "reason": reason,
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 201, "return should be filed");
    let body = response_json(response).await;
    body["data"].clone()
}

// ==================== Submission ====================

#[tokio::test]
async fn test_submit_return_draws_stock_immediately() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;
    let stock_id = stock.id.to_string();

    let filed = submit_return(&app, &dist, &stock_id, 8, "Damaged in transit").await;

    assert_eq!(filed["status"], "pending");
    assert_eq!(filed["quantity_returned"], 8);
    assert_eq!(filed["reason"], "Damaged in transit");
    assert_eq!(filed["product_name"], "Ceylon Tea");
    assert!(filed["decided_at"].is_null());

    // The returned units leave the sellable stock right away.
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 22);
}

#[tokio::test]
async fn test_submit_return_rejects_more_than_held() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 5).await;
    let stock_id = stock.id.to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "stock_id": stock_id,
                "quantity": 9,
                "reason": "Damaged in transit",
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    let message = body["message"].as_str().expect("error message");
    assert!(message.contains("Available: 5"), "got: {message}");
    assert!(message.contains("Requested: 9"), "got: {message}");

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 5);
}

#[tokio::test]
async fn test_submit_return_requires_a_reason() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 5).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "stock_id": stock.id,
                "quantity": 2,
                "reason": "",
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

// ==================== Decisions ====================

#[tokio::test]
async fn test_approve_return_credits_the_warehouse() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;
    let stock_id = stock.id.to_string();
    let product_id = product.id.to_string();

    // Acceptance emptied the warehouse row when the stock was granted.
    assert_eq!(warehouse_quantity(&app, &product_id).await, 0);

    let filed = submit_return(&app, &dist, &stock_id, 8, "Damaged in transit").await;
    let return_id = filed["id"].as_str().expect("return id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/returns/{}/decision", return_id),
            Some(json!({ "action": "approve", "note": "Inspected, accepted back" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["decision_note"], "Inspected, accepted back");
    assert!(!body["data"]["decided_at"].is_null());

    assert_eq!(warehouse_quantity(&app, &product_id).await, 8);
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 22);
}

#[tokio::test]
async fn test_reject_return_restores_distributor_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;
    let stock_id = stock.id.to_string();
    let product_id = product.id.to_string();

    let filed = submit_return(&app, &dist, &stock_id, 8, "Damaged in transit").await;
    let return_id = filed["id"].as_str().expect("return id");
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 22);

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/returns/{}/decision", return_id),
            Some(json!({ "action": "reject", "note": "Packaging intact, resell" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "rejected");

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 30);
    assert_eq!(warehouse_quantity(&app, &product_id).await, 0);
}

#[tokio::test]
async fn test_return_is_decided_once() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;

    let filed = submit_return(&app, &dist, &stock.id.to_string(), 4, "Damaged in transit").await;
    let return_id = filed["id"].as_str().expect("return id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/returns/{}/decision", return_id),
            Some(json!({ "action": "approve" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/returns/{}/decision", return_id),
            Some(json!({ "action": "reject" })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("already been"));
}

#[tokio::test]
async fn test_distributor_cannot_decide_return() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;

    let filed = submit_return(&app, &dist, &stock.id.to_string(), 4, "Damaged in transit").await;
    let return_id = filed["id"].as_str().expect("return id");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/decision", return_id),
            Some(json!({ "action": "approve" })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 403);
}

// ==================== Visibility ====================

#[tokio::test]
async fn test_returns_are_tenant_scoped() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let galle = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let kandy = app.seed_distributor("Kandy Goods", "kandy@distribera.test").await;
    let stock = app.grant_distributor_stock(galle.id, &product, 30).await;

    let filed = submit_return(&app, &galle, &stock.id.to_string(), 4, "Damaged in transit").await;
    let return_id = filed["id"].as_str().expect("return id");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/returns/{}", return_id),
            None,
            Some(&kandy.token),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(Method::GET, "/api/v1/returns", None, Some(&kandy.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    // The admin sees the return and can filter on the distributor.
    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/returns?distributor_id={}", galle.id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["product_name"], "Ceylon Tea");
}

#[tokio::test]
async fn test_list_returns_filters_by_status() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;
    let stock_id = stock.id.to_string();

    let first = submit_return(&app, &dist, &stock_id, 3, "Damaged in transit").await;
    submit_return(&app, &dist, &stock_id, 5, "Wrong variant delivered").await;

    let response = app
        .admin_request(
            Method::POST,
            &format!(
                "/api/v1/returns/{}/decision",
                first["id"].as_str().expect("id")
            ),
            Some(json!({ "action": "approve" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::GET,
            "/api/v1/returns?status=pending",
            None,
            Some(&dist.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["quantity_returned"], 5);

    let response = app
        .request(
            Method::GET,
            "/api/v1/returns?status=approved",
            None,
            Some(&dist.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["quantity_returned"], 3);
}
