//! Integration tests for the order workflow.
//!
//! Tests cover:
//! - Order placement with catalog price snapshots
//! - Acceptance with warehouse-to-distributor stock transfer
//! - Rejection with reasons and reopening for review
//! - Quantity overrides on acceptance
//! - Pending-only edits and cancellation
//! - Tenant scoping between distributors

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
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

/// Place an order over HTTP and return the order body from the envelope.
async fn place_order(app: &TestApp, token: &str, product_id: &str, quantity: i32) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "product_id": product_id, "quantity": quantity })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 201, "order placement should succeed");
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap_or(false));
    body["data"].clone()
}

/// Warehouse quantity for a product, read through the admin listing.
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

// ==================== Placement ====================

#[tokio::test]
async fn test_place_order_snapshots_catalog_pricing() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 30).await;

    assert_eq!(order["status"], "pending");
    assert_eq!(order["requested_quantity"], 30);
    assert!(order["order_number"]
        .as_str()
        .expect("order number")
        .starts_with("ORD-"));
    assert_eq!(decimal(&order["total_amount"]), dec!(7200.00));
    assert!(order["approved_quantity"].is_null());
    assert!(order["decided_at"].is_null());

    let items = order["items"].as_array().expect("order items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], "Ceylon Tea");
    assert_eq!(items[0]["category_name"], "Ceylon Tea Category");
    assert_eq!(items[0]["quantity"], 30);
    assert_eq!(decimal(&items[0]["unit_price"]), dec!(240.00));
    assert_eq!(decimal(&items[0]["subtotal"]), dec!(7200.00));
}

#[tokio::test]
async fn test_place_order_requires_authentication() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cinnamon", dec!(90)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "product_id": product.id, "quantity": 5 })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_admin_cannot_place_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cardamom", dec!(300)).await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "product_id": product.id, "quantity": 5 })),
        )
        .await;
    assert_eq!(
        response.status(),
        403,
        "orders belong to distributor accounts"
    );
}

#[tokio::test]
async fn test_place_order_rejects_inactive_product() {
    let app = TestApp::new().await;
    let product = app.seed_product("Legacy Blend", dec!(150)).await;
    let dist = app.seed_distributor("Matara Stores", "matara@distribera.test").await;

    let response = app
        .admin_request(
            Method::PUT,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "product_id": product.id, "quantity": 5 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("no longer available"));
}

#[tokio::test]
async fn test_place_order_rejects_zero_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("Pepper", dec!(80)).await;
    let dist = app.seed_distributor("Kandy Goods", "kandy@distribera.test").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "product_id": product.id, "quantity": 0 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

// ==================== Acceptance ====================

#[tokio::test]
async fn test_accept_order_transfers_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 100).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 30).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(response.status(), 200, "acceptance should succeed");
    let body = response_json(response).await;
    let decided = &body["data"];

    assert_eq!(decided["status"], "accepted");
    assert_eq!(decided["approved_quantity"], 30);
    assert_eq!(decimal(&decided["approved_total"]), dec!(7200.00));
    assert!(!decided["decided_at"].is_null());

    let notices = decided["messages"].as_array().expect("decision notices");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["message_type"], "accept");
    assert!(notices[0]["body"]
        .as_str()
        .expect("notice body")
        .contains("30 unit(s) transferred"));

    // Warehouse lost the units, the distributor gained them.
    assert_eq!(warehouse_quantity(&app, &product.id.to_string()).await, 70);

    let response = app
        .request(Method::GET, "/api/v1/my-stock", None, Some(&dist.token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let rows = body["data"]["items"].as_array().expect("my-stock items");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["product_name"], "Ceylon Tea");
    assert_eq!(rows[0]["quantity"], 30);
    assert_eq!(decimal(&rows[0]["unit_price"]), dec!(240.00));
}

#[tokio::test]
async fn test_accept_fails_on_insufficient_warehouse_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 10).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 50).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    let message = body["message"].as_str().expect("error message");
    assert!(message.contains("Available: 10"), "got: {message}");
    assert!(message.contains("Requested: 50"), "got: {message}");

    // Nothing moved: the order is still pending and the warehouse untouched.
    let response = app
        .admin_request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(warehouse_quantity(&app, &product.id.to_string()).await, 10);
}

#[tokio::test]
async fn test_accept_with_reduced_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 100).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 40).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept", "quantity": 25, "reason": "Partial allocation this week" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["approved_quantity"], 25);
    assert_eq!(decimal(&body["data"]["approved_total"]), dec!(2500.00));

    assert_eq!(warehouse_quantity(&app, &product.id.to_string()).await, 75);

    let response = app
        .request(Method::GET, "/api/v1/my-stock", None, Some(&dist.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"][0]["quantity"], 25);
}

#[tokio::test]
async fn test_accept_quantity_cannot_exceed_requested() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 200).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 40).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept", "quantity": 60 })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("exceeds the requested"));
}

#[tokio::test]
async fn test_accept_is_final() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(100.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 100).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 10).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    // A second decision of any kind is refused.
    for action in ["accept", "reject", "pending"] {
        let response = app
            .admin_request(
                Method::POST,
                &format!("/api/v1/orders/{}/decision", order_id),
                Some(json!({ "action": action })),
            )
            .await;
        assert_eq!(response.status(), 400, "action {action} on accepted order");
    }
}

// ==================== Rejection and reopening ====================

#[tokio::test]
async fn test_reject_records_reason_and_reopen_clears_decision() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 100).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 30).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "reject", "reason": "Route already saturated" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "rejected");
    assert!(!body["data"]["decided_at"].is_null());

    let notices = body["data"]["messages"].as_array().expect("notices");
    assert_eq!(notices[0]["message_type"], "reject");
    assert!(notices[0]["body"]
        .as_str()
        .expect("notice body")
        .contains("Route already saturated"));

    // No stock moved on rejection.
    assert_eq!(warehouse_quantity(&app, &product.id.to_string()).await, 100);

    // Reopen for another review round.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "pending" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["decided_at"].is_null());
    assert!(body["data"]["approved_quantity"].is_null());

    // The reopened order can now be accepted.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(warehouse_quantity(&app, &product.id.to_string()).await, 70);
}

#[tokio::test]
async fn test_reopen_requires_a_rejected_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 5).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "pending" })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("Only rejected orders"));
}

#[tokio::test]
async fn test_distributor_cannot_decide_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 5).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept" })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 403);
}

// ==================== Edits and cancellation ====================

#[tokio::test]
async fn test_update_pending_order_recomputes_total() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 5).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}", order_id),
            Some(json!({ "quantity": 8, "notes": "Festival demand" })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["requested_quantity"], 8);
    assert_eq!(decimal(&body["data"]["total_amount"]), dec!(1920.00));
    assert_eq!(body["data"]["notes"], "Festival demand");
    assert_eq!(body["data"]["items"][0]["quantity"], 8);
}

#[tokio::test]
async fn test_cancel_pending_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 5).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "cancelled");

    // A cancelled order can no longer be edited or cancelled again.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}", order_id),
            Some(json!({ "quantity": 3 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            None,
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_decided_order_cannot_be_edited() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 50).await;

    let order = place_order(&app, &dist.token, &product.id.to_string(), 10).await;
    let order_id = order["id"].as_str().expect("order id");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", order_id),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}", order_id),
            Some(json!({ "quantity": 20 })),
            Some(&dist.token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

// ==================== Visibility ====================

#[tokio::test]
async fn test_orders_are_tenant_scoped() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let galle = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    let kandy = app.seed_distributor("Kandy Goods", "kandy@distribera.test").await;

    let order = place_order(&app, &galle.token, &product.id.to_string(), 5).await;
    let order_id = order["id"].as_str().expect("order id");

    // Another distributor sees a not-found answer, not a forbidden one.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&kandy.token),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&kandy.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    // The admin listing spans tenants and names the distributor.
    let response = app.admin_request(Method::GET, "/api/v1/orders", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["distributor_name"], "Galle Traders");
}

#[tokio::test]
async fn test_list_orders_filters_by_status() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceylon Tea", dec!(240.00)).await;
    let dist = app.seed_distributor("Galle Traders", "galle@distribera.test").await;
    app.seed_warehouse_stock(product.id, 100).await;

    let first = place_order(&app, &dist.token, &product.id.to_string(), 10).await;
    place_order(&app, &dist.token, &product.id.to_string(), 20).await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/orders/{}/decision", first["id"].as_str().expect("id")),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders?status=pending",
            None,
            Some(&dist.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["requested_quantity"], 20);

    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/orders?distributor_id={}", dist.id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);
}
