//! Integration tests for distributor-held stock.
//!
//! Tests cover:
//! - Listing and searching the caller's own rows
//! - Tenant scoping of row lookups
//! - Manual quantity corrections
//! - Dashboard stats with the low-stock count
//! - The availability probe behind the sale form

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

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

// ==================== Listing ====================

#[tokio::test]
async fn test_list_and_search_my_stock() {
    let app = TestApp::new().await;
    let tea = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let jaggery = app.seed_product("Kithul Jaggery", dec!(380.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.grant_distributor_stock(dist.id, &tea, 30).await;
    app.grant_distributor_stock(dist.id, &jaggery, 12).await;

    let response = app
        .request(Method::GET, "/api/v1/my-stock", None, Some(&dist.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);
    for row in body["data"]["items"].as_array().expect("stock items") {
        assert!(!row["product_name"].is_null());
        assert!(!row["last_updated"].is_null());
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/my-stock?search=Jaggery",
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["product_name"], "Kithul Jaggery");
    assert_eq!(body["data"]["items"][0]["quantity"], 12);

    // Variant size is searchable too; both seeded rows share it
    let response = app
        .request(
            Method::GET,
            "/api/v1/my-stock?search=500g",
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn test_stock_row_lookup_is_tenant_scoped() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let owner = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let other = app.seed_distributor("Kandy Stores", "kandy@distribera.test").await;
    let stock = app.grant_distributor_stock(owner.id, &product, 30).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/my-stock/{}", stock.id),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product_name"], "Ceylon Tea");
    assert_eq!(body["data"]["quantity"], 30);
    assert_eq!(decimal(&body["data"]["unit_price"]), dec!(240.00));

    // Another distributor sees someone else's row as missing
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/my-stock/{}", stock.id),
            None,
            Some(&other.token),
        )
        .await;
    assert_eq!(response.status(), 404);
}

// ==================== Quantity corrections ====================

#[tokio::test]
async fn test_set_quantity_correction() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;
    let uri = format!("/api/v1/my-stock/{}/quantity", stock.id);

    let response = app
        .request(Method::PUT, &uri, Some(json!({"quantity": 12})), Some(&dist.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 12);
    assert_eq!(body["data"]["product_name"], "Ceylon Tea");

    // Recounting down to nothing is a valid correction
    let response = app
        .request(Method::PUT, &uri, Some(json!({"quantity": 0})), Some(&dist.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 0);

    let response = app
        .request(Method::PUT, &uri, Some(json!({"quantity": -3})), Some(&dist.token))
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    let message = body["message"].as_str().expect("error message");
    assert!(message.contains("cannot be negative"), "got: {message}");
}

#[tokio::test]
async fn test_quantity_correction_is_tenant_scoped() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let owner = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let other = app.seed_distributor("Kandy Stores", "kandy@distribera.test").await;
    let stock = app.grant_distributor_stock(owner.id, &product, 30).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/my-stock/{}/quantity", stock.id),
            Some(json!({"quantity": 1})),
            Some(&other.token),
        )
        .await;
    assert_eq!(response.status(), 404);

    // The owner's quantity is untouched
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/my-stock/{}", stock.id),
            None,
            Some(&owner.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 30);
}

// ==================== Stats ====================

#[tokio::test]
async fn test_my_stock_stats() {
    let app = TestApp::new().await;
    let tea = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let spice = app.seed_product("Spice Mix", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.grant_distributor_stock(dist.id, &tea, 30).await;
    app.grant_distributor_stock(dist.id, &spice, 5).await;

    let response = app
        .request(Method::GET, "/api/v1/my-stock/stats", None, Some(&dist.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let stats = &body["data"];

    assert_eq!(stats["distinct_products"], 2);
    assert_eq!(stats["total_quantity"], 35);
    assert_eq!(decimal(&stats["total_value"]), dec!(7700.00));
    // Only the five-unit row sits at or below the threshold
    assert_eq!(stats["low_stock_count"], 1);
    assert_eq!(stats["low_stock_threshold"], 10);
}

// ==================== Availability probe ====================

#[tokio::test]
async fn test_availability_probe() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;

    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/my-stock/status?product_id={}&variant_size=500g",
                product.id
            ),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["in_stock"], true);
    assert_eq!(body["data"]["quantity"], 30);
    assert_eq!(body["data"]["stock_id"], stock.id.to_string());
    assert_eq!(decimal(&body["data"]["unit_price"]), dec!(240.00));

    // A variant the distributor does not hold
    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/my-stock/status?product_id={}&variant_size=1kg",
                product.id
            ),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["in_stock"], false);
    assert_eq!(body["data"]["quantity"], 0);
    assert!(body["data"]["stock_id"].is_null());
    assert!(body["data"]["unit_price"].is_null());

    // A product nobody granted to this distributor
    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/my-stock/status?product_id={}&variant_size=500g",
                Uuid::new_v4()
            ),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["in_stock"], false);
}

#[tokio::test]
async fn test_availability_probe_on_sold_out_row() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let stock = app.grant_distributor_stock(dist.id, &product, 30).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/my-stock/{}/quantity", stock.id),
            Some(json!({"quantity": 0})),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);

    // The row still exists, but holds nothing sellable
    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/my-stock/status?product_id={}&variant_size=500g",
                product.id
            ),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["in_stock"], false);
    assert_eq!(body["data"]["quantity"], 0);
    assert_eq!(body["data"]["stock_id"], stock.id.to_string());
}
