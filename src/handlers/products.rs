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

use crate::entities::product;
use crate::handlers::common::{clamp_limit, page_or_first, total_pages};
use crate::services::products::{CreateProductInput, ProductFilter, UpdateProductInput};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive substring match on the product name
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub unit_price: Decimal,
    pub variant_size: String,
    pub shelf_life_days: i32,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category_id: model.category_id,
            unit_price: model.unit_price,
            variant_size: model.variant_size,
            shelf_life_days: model.shelf_life_days,
            image_url: model.image_url,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<PaginatedResponse<ProductResponse>> {
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
    };

    let (records, total) = state.services.products.list_products(filter, page, limit).await?;
    let items: Vec<ProductResponse> = records.into_iter().map(ProductResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

/// Active products for one category, used to fill the order form picker.
pub async fn list_products_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Vec<ProductResponse>> {
    let records = state.services.products.products_by_category(category_id).await?;
    let items = records.into_iter().map(ProductResponse::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductResponse> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(ProductResponse::from(product))))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), crate::errors::ServiceError> {
    let created = state.services.products.create_product(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ProductResponse::from(created))),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> ApiResult<ProductResponse> {
    let updated = state.services.products.update_product(id, payload).await?;
    Ok(Json(ApiResponse::success(ProductResponse::from(updated))))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.products.delete_product(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}
