//! Distribera API Library
//!
//! This crate provides the core functionality for the Distribera API
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
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let services =
            handlers::AppServices::new(db.clone(), event_sender.clone(), config.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
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
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
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
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API v1 routes with per-group permission gating. Several paths appear in
// more than one sub-router with different methods; merging keeps each
// method's own permission layer.
pub fn api_v1_routes() -> Router<AppState> {
    // Catalog routes: readable by both roles, managed by admins
    let categories_read = Router::new()
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/:id", get(handlers::categories::get_category))
        .with_permission(perm::CATEGORIES_READ);

    let categories_manage = Router::new()
        .route(
            "/categories",
            axum::routing::post(handlers::categories::create_category),
        )
        .route(
            "/categories/:id",
            axum::routing::put(handlers::categories::update_category),
        )
        .route(
            "/categories/:id",
            axum::routing::delete(handlers::categories::delete_category),
        )
        .with_permission(perm::CATEGORIES_MANAGE);

    let products_read = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route(
            "/categories/:id/products",
            get(handlers::products::list_products_by_category),
        )
        .with_permission(perm::PRODUCTS_READ);

    let products_create = Router::new()
        .route(
            "/products",
            axum::routing::post(handlers::products::create_product),
        )
        .with_permission(perm::PRODUCTS_CREATE);

    let products_update = Router::new()
        .route(
            "/products/:id",
            axum::routing::put(handlers::products::update_product),
        )
        .with_permission(perm::PRODUCTS_UPDATE);

    let products_delete = Router::new()
        .route(
            "/products/:id",
            axum::routing::delete(handlers::products::delete_product),
        )
        .with_permission(perm::PRODUCTS_DELETE);

    // Central warehouse stock (admin)
    let inventory_read = Router::new()
        .route(
            "/warehouse-stock",
            get(handlers::warehouse_stock::list_stock),
        )
        .route(
            "/warehouse-stock/summary",
            get(handlers::warehouse_stock::stock_summary),
        )
        .route(
            "/warehouse-stock/:id",
            get(handlers::warehouse_stock::get_stock),
        )
        .with_permission(perm::INVENTORY_READ);

    let inventory_adjust = Router::new()
        .route(
            "/warehouse-stock",
            axum::routing::post(handlers::warehouse_stock::add_stock),
        )
        .route(
            "/warehouse-stock/:id",
            axum::routing::put(handlers::warehouse_stock::update_stock),
        )
        .route(
            "/warehouse-stock/:id",
            axum::routing::delete(handlers::warehouse_stock::delete_stock),
        )
        .with_permission(perm::INVENTORY_ADJUST);

    // Distributor accounts (admin)
    let distributors_read = Router::new()
        .route(
            "/distributors",
            get(handlers::distributors::list_distributors),
        )
        .route(
            "/distributors/:id",
            get(handlers::distributors::get_distributor),
        )
        .with_permission(perm::DISTRIBUTORS_READ);

    let distributors_manage = Router::new()
        .route(
            "/distributors",
            axum::routing::post(handlers::distributors::create_distributor),
        )
        .route(
            "/distributors/:id",
            axum::routing::put(handlers::distributors::update_distributor),
        )
        .route(
            "/distributors/:id",
            axum::routing::delete(handlers::distributors::delete_distributor),
        )
        .with_permission(perm::DISTRIBUTORS_MANAGE);

    // Orders
    let orders_read = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .with_permission(perm::ORDERS_READ);

    let orders_create = Router::new()
        .route(
            "/orders",
            axum::routing::post(handlers::orders::create_order),
        )
        .with_permission(perm::ORDERS_CREATE);

    let orders_update = Router::new()
        .route(
            "/orders/:id",
            axum::routing::put(handlers::orders::update_order),
        )
        .with_permission(perm::ORDERS_UPDATE);

    let orders_cancel = Router::new()
        .route(
            "/orders/:id/cancel",
            axum::routing::post(handlers::orders::cancel_order),
        )
        .with_permission(perm::ORDERS_CANCEL);

    let orders_decide = Router::new()
        .route(
            "/orders/:id/decision",
            axum::routing::post(handlers::orders::decide_order),
        )
        .with_permission(perm::ORDERS_DECIDE);

    // Order-scoped messaging
    let messages_read = Router::new()
        .route(
            "/orders/:id/messages",
            get(handlers::messages::list_order_messages),
        )
        .route(
            "/orders/:id/messages/read",
            axum::routing::post(handlers::messages::mark_order_messages_read),
        )
        .route(
            "/messages/unread-count",
            get(handlers::messages::unread_message_count),
        )
        .with_permission(perm::MESSAGES_READ);

    let messages_create = Router::new()
        .route(
            "/orders/:id/messages",
            axum::routing::post(handlers::messages::post_order_message),
        )
        .with_permission(perm::MESSAGES_CREATE);

    // Distributor-held stock
    let my_stock_read = Router::new()
        .route("/my-stock", get(handlers::my_stock::list_my_stock))
        .route("/my-stock/status", get(handlers::my_stock::my_stock_status))
        .route("/my-stock/:id", get(handlers::my_stock::get_my_stock))
        .with_permission(perm::STOCK_READ);

    let my_stock_update = Router::new()
        .route(
            "/my-stock/:id/quantity",
            axum::routing::put(handlers::my_stock::set_my_stock_quantity),
        )
        .with_permission(perm::STOCK_UPDATE);

    // Customer sales
    let sales_read = Router::new()
        .route("/sales", get(handlers::sales::list_sales))
        .route("/sales/:id", get(handlers::sales::get_sale))
        .with_permission(perm::SALES_READ);

    let sales_create = Router::new()
        .route("/sales", axum::routing::post(handlers::sales::create_sale))
        .with_permission(perm::SALES_CREATE);

    let sales_update = Router::new()
        .route(
            "/sales/:id",
            axum::routing::put(handlers::sales::update_sale),
        )
        .with_permission(perm::SALES_UPDATE);

    let sales_delete = Router::new()
        .route(
            "/sales/:id",
            axum::routing::delete(handlers::sales::delete_sale),
        )
        .with_permission(perm::SALES_DELETE);

    // Returns
    let returns_read = Router::new()
        .route("/returns", get(handlers::returns::list_returns))
        .route("/returns/:id", get(handlers::returns::get_return))
        .with_permission(perm::RETURNS_READ);

    let returns_create = Router::new()
        .route(
            "/returns",
            axum::routing::post(handlers::returns::create_return),
        )
        .with_permission(perm::RETURNS_CREATE);

    let returns_decide = Router::new()
        .route(
            "/returns/:id/decision",
            axum::routing::post(handlers::returns::decide_return),
        )
        .with_permission(perm::RETURNS_DECIDE);

    // Dashboard statistics
    let reports = Router::new()
        .route("/my-stock/stats", get(handlers::my_stock::my_stock_stats))
        .route("/sales/stats", get(handlers::sales::sales_stats))
        .with_permission(perm::REPORTS_READ);

    // Self-service profile; role-gated rather than permission-gated because
    // it only ever acts on the caller's own account
    let profile = Router::new()
        .route("/profile", get(handlers::profile::get_profile))
        .route(
            "/profile",
            axum::routing::put(handlers::profile::update_profile),
        )
        .route(
            "/profile/change-password",
            axum::routing::post(handlers::profile::change_password),
        )
        .with_role(auth::ROLE_DISTRIBUTOR);

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Catalog API (auth + permissions)
        .merge(categories_read)
        .merge(categories_manage)
        .merge(products_read)
        .merge(products_create)
        .merge(products_update)
        .merge(products_delete)
        // Warehouse stock API (admin)
        .merge(inventory_read)
        .merge(inventory_adjust)
        // Distributor accounts API (admin)
        .merge(distributors_read)
        .merge(distributors_manage)
        // Orders API (auth + permissions)
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_update)
        .merge(orders_cancel)
        .merge(orders_decide)
        // Order messaging API
        .merge(messages_read)
        .merge(messages_create)
        // Distributor stock API
        .merge(my_stock_read)
        .merge(my_stock_update)
        // Sales API
        .merge(sales_read)
        .merge(sales_create)
        .merge(sales_update)
        .merge(sales_delete)
        // Returns API
        .merge(returns_read)
        .merge(returns_create)
        .merge(returns_decide)
        // Statistics
        .merge(reports)
        // Profile API (distributor self-service)
        .merge(profile)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "distribera-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

pub mod prelude {
    pub use crate::config::*;
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::openapi::*;
    pub use crate::services::*;
    pub use crate::tracing::*;
}
