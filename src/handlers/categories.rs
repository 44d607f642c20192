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
use validator::Validate;

use crate::entities::category;
use crate::handlers::common::{clamp_limit, page_or_first, total_pages};
use crate::services::categories::{CreateCategoryInput, UpdateCategoryInput};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct CategoryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Description must be between 1 and 1000 characters"
    ))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<PaginatedResponse<CategoryResponse>> {
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);

    let (records, total) = state.services.categories.list_categories(page, limit).await?;
    let items: Vec<CategoryResponse> = records.into_iter().map(CategoryResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CategoryResponse> {
    let category = state.services.categories.get_category(id).await?;
    Ok(Json(ApiResponse::success(CategoryResponse::from(category))))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), crate::errors::ServiceError> {
    payload.validate()?;
    let created = state
        .services
        .categories
        .create_category(CreateCategoryInput {
            name: payload.name,
            description: payload.description,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CategoryResponse::from(created))),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<CategoryResponse> {
    payload.validate()?;
    let updated = state
        .services
        .categories
        .update_category(
            id,
            UpdateCategoryInput {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(CategoryResponse::from(updated))))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.categories.delete_category(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}
