use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::distributor;
use crate::handlers::common::{clamp_limit, page_or_first, total_pages};
use crate::services::distributors::{CreateDistributorInput, UpdateDistributorInput};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct DistributorListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, district or email
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DistributorResponse {
    pub id: Uuid,
    pub name: String,
    pub district: String,
    pub province: String,
    pub owner_name: String,
    pub contact_no: String,
    pub address: Option<String>,
    pub email: String,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<distributor::Model> for DistributorResponse {
    fn from(model: distributor::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            district: model.district,
            province: model.province,
            owner_name: model.owner_name,
            contact_no: model.contact_no,
            address: model.address,
            email: model.email,
            image_url: model.image_url,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub async fn list_distributors(
    State(state): State<AppState>,
    Query(query): Query<DistributorListQuery>,
) -> ApiResult<PaginatedResponse<DistributorResponse>> {
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);

    let (records, total) = state
        .services
        .distributors
        .list_distributors(query.search, page, limit)
        .await?;
    let items: Vec<DistributorResponse> = records
        .into_iter()
        .map(DistributorResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

pub async fn get_distributor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DistributorResponse> {
    let distributor = state.services.distributors.get_distributor(id).await?;
    Ok(Json(ApiResponse::success(DistributorResponse::from(
        distributor,
    ))))
}

pub async fn create_distributor(
    State(state): State<AppState>,
    Json(payload): Json<CreateDistributorInput>,
) -> Result<(StatusCode, Json<ApiResponse<DistributorResponse>>), crate::errors::ServiceError> {
    let created = state.services.distributors.create_distributor(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DistributorResponse::from(created))),
    ))
}

pub async fn update_distributor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDistributorInput>,
) -> ApiResult<DistributorResponse> {
    let updated = state
        .services
        .distributors
        .update_distributor(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(DistributorResponse::from(updated))))
}

pub async fn delete_distributor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.distributors.delete_distributor(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}
