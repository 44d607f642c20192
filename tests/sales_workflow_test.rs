//! Integration tests for customer sales.
//!
//! Tests cover:
//! - Recording a sale and drawing down distributor stock
//! - Overselling guards
//! - Quantity edits moving only the delta
//! - Deletion restoring the full quantity
//! - Dashboard stats and list filters
//! - Tenant scoping of stock rows and sales

mod common;

use axum::{body, http::Method, response::Response};
use common::{DistributorFixture, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal value, got {other}"),
    }
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

async fn record_sale(
    app: &TestApp,
    dist: &DistributorFixture,
    stock_id: &str,
    quantity: i32,
    customer: &str,
) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "stock_id": stock_id,
                "quantity": quantity,
                "customer_name": customer,
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 201, "sale should be recorded");
    let body = response_json(response).await;
    body["data"].clone()
}

// ==================== Recording sales ====================

#[tokio::test]
async fn test_record_sale_draws_down_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 50).await;
    let stock_id = stock.id.to_string();

    let sale = record_sale(&app, &dist, &stock_id, 12, "K. Perera").await;

    assert_eq!(sale["product_name"], "Ceylon Tea");
    assert_eq!(sale["quantity_sold"], 12);
    assert_eq!(sale["customer_name"], "K. Perera");
    assert_eq!(sale["status"], "completed");
    assert_eq!(decimal(&sale["unit_price"]), dec!(240.00));
    assert_eq!(decimal(&sale["total_amount"]), dec!(2880.00));
    assert!(!sale["sold_at"].is_null());

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 38);
}

#[tokio::test]
async fn test_record_sale_rejects_oversell() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 5).await;
    let stock_id = stock.id.to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "stock_id": stock_id,
                "quantity": 8,
                "customer_name": "K. Perera",
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    let message = body["message"].as_str().expect("error message");
    assert!(message.contains("Available: 5"), "got: {message}");
    assert!(message.contains("Requested: 8"), "got: {message}");

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 5);
}

#[tokio::test]
async fn test_record_sale_requires_own_stock_row() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let galle = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let kandy = app.seed_distributor("Kandy Goods", "kandy@distribera.test").await;
    let stock = app.grant_distributor_stock(galle.id, &product, 50).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "stock_id": stock.id,
                "quantity": 1,
                "customer_name": "M. Silva",
            })),
            Some(&kandy.token),
        )
        .await;
    assert_eq!(response.status(), 404, "foreign stock rows stay invisible");

    assert_eq!(stock_quantity(&app, &galle.token, &stock.id.to_string()).await, 50);
}

#[tokio::test]
async fn test_record_sale_validates_customer_name() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 50).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "stock_id": stock.id,
                "quantity": 1,
                "customer_name": "",
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

// ==================== Editing sales ====================

#[tokio::test]
async fn test_update_sale_moves_only_the_delta() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 50).await;
    let stock_id = stock.id.to_string();

    let sale = record_sale(&app, &dist, &stock_id, 10, "K. Perera").await;
    let sale_id = sale["id"].as_str().expect("sale id");
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 40);

    // Raising the quantity draws three more units.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{}", sale_id),
            Some(json!({ "quantity": 13 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity_sold"], 13);
    assert_eq!(decimal(&body["data"]["total_amount"]), dec!(1300.00));
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 37);

    // Lowering it puts the difference back.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{}", sale_id),
            Some(json!({ "quantity": 4 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 46);
}

#[tokio::test]
async fn test_update_sale_delta_cannot_exceed_remaining_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 12).await;
    let stock_id = stock.id.to_string();

    let sale = record_sale(&app, &dist, &stock_id, 10, "K. Perera").await;
    let sale_id = sale["id"].as_str().expect("sale id");
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 2);

    // 10 -> 15 needs five more units but only two remain.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{}", sale_id),
            Some(json!({ "quantity": 15 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 422);

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 2);
}

#[tokio::test]
async fn test_update_sale_details_without_quantity_change() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 20).await;
    let stock_id = stock.id.to_string();

    let sale = record_sale(&app, &dist, &stock_id, 5, "K. Perera").await;
    let sale_id = sale["id"].as_str().expect("sale id");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{}", sale_id),
            Some(json!({
                "customer_name": "K. A. Perera",
                "customer_contact": "+94 71 555 0000",
                "status": "pending",
            })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["customer_name"], "K. A. Perera");
    assert_eq!(body["data"]["customer_contact"], "+94 71 555 0000");
    assert_eq!(body["data"]["status"], "pending");

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 15);
}

// ==================== Deleting sales ====================

#[tokio::test]
async fn test_delete_sale_restores_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;
    let stock_id = stock.id.to_string();

    let sale = record_sale(&app, &dist, &stock_id, 9, "K. Perera").await;
    let sale_id = sale["id"].as_str().expect("sale id");
    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 21);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/sales/{}", sale_id),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["deleted"], true);

    assert_eq!(stock_quantity(&app, &dist.token, &stock_id).await, 30);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/sales/{}", sale_id),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 404);
}

// ==================== Listing and stats ====================

#[tokio::test]
async fn test_list_sales_filters_by_status_and_search() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 100).await;
    let stock_id = stock.id.to_string();

    record_sale(&app, &dist, &stock_id, 3, "K. Perera").await;
    record_sale(&app, &dist, &stock_id, 7, "M. Silva").await;
    let pending = record_sale(&app, &dist, &stock_id, 2, "N. Fernando").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{}", pending["id"].as_str().expect("id")),
            Some(json!({ "status": "pending" })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, "/api/v1/sales", None, Some(&dist.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 3);

    let response = app
        .request(
            Method::GET,
            "/api/v1/sales?status=completed",
            None,
            Some(&dist.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);

    let response = app
        .request(
            Method::GET,
            "/api/v1/sales?search=Silva",
            None,
            Some(&dist.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["customer_name"], "M. Silva");
}

#[tokio::test]
async fn test_sales_stats_totals() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 100).await;
    let stock_id = stock.id.to_string();

    record_sale(&app, &dist, &stock_id, 3, "K. Perera").await;
    record_sale(&app, &dist, &stock_id, 7, "M. Silva").await;
    let pending = record_sale(&app, &dist, &stock_id, 2, "N. Fernando").await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/sales/{}", pending["id"].as_str().expect("id")),
            Some(json!({ "status": "pending" })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, "/api/v1/sales/stats", None, Some(&dist.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let stats = &body["data"];
    assert_eq!(stats["count"], 3);
    assert_eq!(stats["units"], 12);
    assert_eq!(decimal(&stats["revenue"]), dec!(1200.00));
    assert_eq!(stats["completed"], 2);
}

#[tokio::test]
async fn test_sales_are_tenant_scoped() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let galle = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let kandy = app.seed_distributor("Kandy Goods", "kandy@distribera.test").await;
    let stock = app.grant_distributor_stock(galle.id, &product, 40).await;

    let sale = record_sale(&app, &galle, &stock.id.to_string(), 6, "K. Perera").await;
    let sale_id = sale["id"].as_str().expect("sale id");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/sales/{}", sale_id),
            None,
            Some(&kandy.token),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/sales/{}", sale_id),
            None,
            Some(&kandy.token),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(Method::GET, "/api/v1/sales", None, Some(&kandy.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_admin_cannot_record_sales() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 10).await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "stock_id": stock.id,
                "quantity": 1,
                "customer_name": "K. Perera",
            })),
        )
        .await;
    assert_eq!(response.status(), 403);
}
