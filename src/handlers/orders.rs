use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::{order, order_item};
use crate::errors::ServiceError;
use crate::handlers::common::{
    clamp_limit, page_or_first, require_admin, require_distributor, total_pages, visibility_scope,
};
use crate::handlers::messages::MessageResponse;
use crate::services::orders::{
    CreateOrderInput, OrderDecisionAction, OrderDecisionInput, OrderDetail, OrderFilter,
    OrderStatus, UpdateOrderInput,
};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    /// Admin only; ignored for distributor callers
    pub distributor_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub distributor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributor_name: Option<String>,
    pub status: String,
    pub total_amount: Decimal,
    pub requested_quantity: i32,
    pub approved_quantity: Option<i32>,
    pub approved_total: Option<Decimal>,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            distributor_id: model.distributor_id,
            distributor_name: None,
            status: model.status,
            total_amount: model.total_amount,
            requested_quantity: model.requested_quantity,
            approved_quantity: model.approved_quantity,
            approved_total: model.approved_total,
            notes: model.notes,
            decided_at: model.decided_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub category_name: String,
    pub variant_size: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_name: model.product_name,
            category_name: model.category_name,
            variant_size: model.variant_size,
            unit_price: model.unit_price,
            quantity: model.quantity,
            subtotal: model.subtotal,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub messages: Vec<MessageResponse>,
}

impl From<OrderDetail> for OrderDetailResponse {
    fn from(detail: OrderDetail) -> Self {
        Self {
            order: OrderResponse::from(detail.order),
            items: detail.items.into_iter().map(OrderItemResponse::from).collect(),
            messages: detail
                .messages
                .into_iter()
                .map(MessageResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderDecisionRequest {
    pub action: OrderDecisionAction,
    /// Approved quantity override; only downwards from the request
    pub quantity: Option<i32>,
    /// Free-text note delivered to the distributor with the decision
    #[validate(length(max = 1000, message = "Reason cannot exceed 1000 characters"))]
    pub reason: Option<String>,
}

/// Place an order for warehouse stock
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Places a pending order for one product. Pricing is snapshotted when the order is placed.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderDetailResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not a distributor", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetailResponse>>), ServiceError> {
    let distributor_id = require_distributor(&auth_user)?;
    payload.validate()?;

    let detail = state
        .services
        .orders
        .create_order(
            distributor_id,
            CreateOrderInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
                notes: payload.notes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(OrderDetailResponse::from(detail))),
    ))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Admins see every order; distributors only their own.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("distributor_id" = Option<Uuid>, Query, description = "Admin only: filter by distributor"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);
    let filter = OrderFilter {
        status: query.status,
        distributor_id: query.distributor_id,
    };

    let (items, total) = match visibility_scope(&auth_user)? {
        None => {
            let (rows, total) = state
                .services
                .orders
                .list_orders_with_distributor(filter, page, limit)
                .await?;
            let items = rows
                .into_iter()
                .map(|(order, distributor)| {
                    let mut response = OrderResponse::from(order);
                    response.distributor_name = distributor.map(|d| d.name);
                    response
                })
                .collect();
            (items, total)
        }
        scope @ Some(_) => {
            let (orders, total) = state
                .services
                .orders
                .list_orders(scope, filter, page, limit)
                .await?;
            let items = orders.into_iter().map(OrderResponse::from).collect();
            (items, total)
        }
    };

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

/// Fetch one order with items and conversation
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetailResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, ServiceError> {
    let scope = visibility_scope(&auth_user)?;
    let detail = state.services.orders.get_order(id, scope).await?;
    Ok(Json(ApiResponse::success(OrderDetailResponse::from(detail))))
}

/// Edit a pending order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    summary = "Update order",
    description = "Changes the requested quantity of the caller's own pending order.",
    request_body = UpdateOrderRequest,
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderDetailResponse>),
        (status = 400, description = "Order is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, ServiceError> {
    let distributor_id = require_distributor(&auth_user)?;
    payload.validate()?;
    let detail = state
        .services
        .orders
        .update_order(
            distributor_id,
            id,
            UpdateOrderInput {
                quantity: payload.quantity,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(OrderDetailResponse::from(detail))))
}

/// Cancel a pending order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Cancel order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let distributor_id = require_distributor(&auth_user)?;
    let order = state.services.orders.cancel_order(distributor_id, id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::from(order))))
}

/// Decide a pending order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/decision",
    summary = "Decide order",
    description = "Accepts, rejects or reopens an order. Acceptance transfers warehouse stock to the distributor and records an accept notice, all in one transaction.",
    request_body = OrderDecisionRequest,
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Decision applied", body = ApiResponse<OrderDetailResponse>),
        (status = 400, description = "Order is not in a decidable state", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough warehouse stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn decide_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderDecisionRequest>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, ServiceError> {
    let admin_id = require_admin(&auth_user)?;
    payload.validate()?;
    let detail = state
        .services
        .orders
        .decide_order(
            admin_id,
            id,
            OrderDecisionInput {
                action: payload.action,
                quantity: payload.quantity,
                reason: payload.reason,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(OrderDetailResponse::from(detail))))
}
