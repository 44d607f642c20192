use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::handlers::common::{clamp_limit, page_or_first, require_distributor, total_pages};
use crate::services::distributor_stock::{
    DistributorStockRow, MyStockStats, SetQuantityInput, StockAvailability,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default)]
pub struct MyStockListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub product_id: Uuid,
    pub variant_size: String,
}

#[derive(Debug, Serialize)]
pub struct MyStockResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub variant_size: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl From<DistributorStockRow> for MyStockResponse {
    fn from(row: DistributorStockRow) -> Self {
        Self {
            id: row.stock.id,
            product_id: row.stock.product_id,
            product_name: row.product_name,
            variant_size: row.stock.variant_size,
            quantity: row.stock.quantity,
            unit_price: row.stock.unit_price,
            last_updated: row.stock.last_updated,
        }
    }
}

pub async fn list_my_stock(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<MyStockListQuery>,
) -> ApiResult<PaginatedResponse<MyStockResponse>> {
    let distributor_id = require_distributor(&auth_user)?;
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);

    let (rows, total) = state
        .services
        .distributor_stock
        .list_stock(distributor_id, query.search, page, limit)
        .await?;
    let items: Vec<MyStockResponse> = rows.into_iter().map(MyStockResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

pub async fn my_stock_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<MyStockStats> {
    let distributor_id = require_distributor(&auth_user)?;
    let stats = state.services.distributor_stock.stats(distributor_id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Availability probe for the sale form: does the caller hold this
/// product+variant, and at what quantity and price.
pub async fn my_stock_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<StockAvailability> {
    let distributor_id = require_distributor(&auth_user)?;
    let availability = state
        .services
        .distributor_stock
        .availability(distributor_id, query.product_id, &query.variant_size)
        .await?;
    Ok(Json(ApiResponse::success(availability)))
}

pub async fn get_my_stock(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<MyStockResponse> {
    let distributor_id = require_distributor(&auth_user)?;
    let row = state
        .services
        .distributor_stock
        .get_stock(distributor_id, id)
        .await?;
    Ok(Json(ApiResponse::success(MyStockResponse::from(row))))
}

/// Manual quantity correction, for shrinkage or recount adjustments.
pub async fn set_my_stock_quantity(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetQuantityInput>,
) -> ApiResult<MyStockResponse> {
    let distributor_id = require_distributor(&auth_user)?;
    let saved = state
        .services
        .distributor_stock
        .set_quantity(distributor_id, id, payload)
        .await?;
    let row = state
        .services
        .distributor_stock
        .get_stock(distributor_id, saved.id)
        .await?;
    Ok(Json(ApiResponse::success(MyStockResponse::from(row))))
}
