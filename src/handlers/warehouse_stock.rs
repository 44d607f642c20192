use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::handlers::common::{clamp_limit, page_or_first, total_pages};
use crate::services::warehouse_stock::{
    AddStockInput, StockSummary, UpdateStockInput, WarehouseStockRow,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct StockListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches product name, category name or variant size
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseStockResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub variant_size: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub added_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<WarehouseStockRow> for WarehouseStockResponse {
    fn from(row: WarehouseStockRow) -> Self {
        Self {
            id: row.stock.id,
            product_id: row.stock.product_id,
            product_name: row.product_name,
            variant_size: row.stock.variant_size,
            quantity: row.stock.quantity,
            unit_price: row.stock.unit_price,
            added_at: row.stock.added_at,
            updated_at: row.stock.updated_at,
        }
    }
}

/// List warehouse stock rows
#[utoipa::path(
    get,
    path = "/api/v1/warehouse-stock",
    summary = "List warehouse stock",
    description = "Get a paginated list of warehouse stock rows joined with their products",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Search across product, category and variant"),
    ),
    responses(
        (status = 200, description = "Stock rows retrieved", body = ApiResponse<PaginatedResponse<WarehouseStockResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(query): Query<StockListQuery>,
) -> ApiResult<PaginatedResponse<WarehouseStockResponse>> {
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);

    let (records, total) = state
        .services
        .warehouse_stock
        .list_stock(query.search, page, limit)
        .await?;
    let items: Vec<WarehouseStockResponse> = records
        .into_iter()
        .map(WarehouseStockResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

/// Per-product totals across every variant plus grand totals
#[utoipa::path(
    get,
    path = "/api/v1/warehouse-stock/summary",
    summary = "Warehouse stock summary",
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<StockSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn stock_summary(State(state): State<AppState>) -> ApiResult<StockSummary> {
    let summary = state.services.warehouse_stock.stock_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WarehouseStockResponse> {
    let row = state.services.warehouse_stock.get_stock(id).await?;
    Ok(Json(ApiResponse::success(WarehouseStockResponse::from(row))))
}

/// Add stock for a product
#[utoipa::path(
    post,
    path = "/api/v1/warehouse-stock",
    summary = "Add warehouse stock",
    description = "Adds quantity for a product and variant. An existing row for the combination is topped up.",
    request_body = AddStockInput,
    responses(
        (status = 201, description = "Stock recorded", body = ApiResponse<WarehouseStockResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn add_stock(
    State(state): State<AppState>,
    Json(payload): Json<AddStockInput>,
) -> Result<(StatusCode, Json<ApiResponse<WarehouseStockResponse>>), crate::errors::ServiceError> {
    let saved = state.services.warehouse_stock.add_stock(payload).await?;
    let row = state.services.warehouse_stock.get_stock(saved.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(WarehouseStockResponse::from(row))),
    ))
}

pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockInput>,
) -> ApiResult<WarehouseStockResponse> {
    let saved = state.services.warehouse_stock.update_stock(id, payload).await?;
    let row = state.services.warehouse_stock.get_stock(saved.id).await?;
    Ok(Json(ApiResponse::success(WarehouseStockResponse::from(row))))
}

pub async fn delete_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.warehouse_stock.delete_stock(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}
