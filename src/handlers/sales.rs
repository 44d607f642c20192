use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::sale;
use crate::errors::ServiceError;
use crate::handlers::common::{clamp_limit, page_or_first, require_distributor, total_pages};
use crate::services::sales::{
    CreateSaleInput, SaleFilter, SaleStatus, SalesStats, UpdateSaleInput,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default)]
pub struct SaleListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches product or customer name
    pub search: Option<String>,
    pub status: Option<SaleStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SaleListQuery {
    fn filter(&self) -> SaleFilter {
        SaleFilter {
            search: self.search.clone(),
            status: self.status,
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_size: String,
    pub quantity_sold: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub customer_contact: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub sold_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<sale::Model> for SaleResponse {
    fn from(model: sale::Model) -> Self {
        Self {
            id: model.id,
            stock_id: model.stock_id,
            product_id: model.product_id,
            product_name: model.product_name,
            variant_size: model.variant_size,
            quantity_sold: model.quantity_sold,
            unit_price: model.unit_price,
            total_amount: model.total_amount,
            customer_name: model.customer_name,
            customer_contact: model.customer_contact,
            notes: model.notes,
            status: model.status,
            sold_at: model.sold_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub async fn create_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateSaleInput>,
) -> Result<(StatusCode, Json<ApiResponse<SaleResponse>>), ServiceError> {
    let distributor_id = require_distributor(&auth_user)?;
    let created = state.services.sales.create_sale(distributor_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SaleResponse::from(created))),
    ))
}

pub async fn list_sales(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<SaleListQuery>,
) -> ApiResult<PaginatedResponse<SaleResponse>> {
    let distributor_id = require_distributor(&auth_user)?;
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);

    let (sales, total) = state
        .services
        .sales
        .list_sales(distributor_id, query.filter(), page, limit)
        .await?;
    let items: Vec<SaleResponse> = sales.into_iter().map(SaleResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

/// Totals for the dashboard cards, over the same filters as the listing.
pub async fn sales_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<SaleListQuery>,
) -> ApiResult<SalesStats> {
    let distributor_id = require_distributor(&auth_user)?;
    let stats = state
        .services
        .sales
        .sales_stats(distributor_id, query.filter())
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SaleResponse> {
    let distributor_id = require_distributor(&auth_user)?;
    let sale = state.services.sales.get_sale(distributor_id, id).await?;
    Ok(Json(ApiResponse::success(SaleResponse::from(sale))))
}

pub async fn update_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleInput>,
) -> ApiResult<SaleResponse> {
    let distributor_id = require_distributor(&auth_user)?;
    let updated = state
        .services
        .sales
        .update_sale(distributor_id, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(SaleResponse::from(updated))))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let distributor_id = require_distributor(&auth_user)?;
    state.services.sales.delete_sale(distributor_id, id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true,
    }))))
}
