use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{
    clamp_limit, page_or_first, require_admin, require_distributor, total_pages, visibility_scope,
};
use crate::services::returns::{
    CreateReturnInput, ReturnDecisionInput, ReturnFilter, ReturnRow, ReturnStatus,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default)]
pub struct ReturnListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ReturnStatus>,
    /// Admin only; ignored for distributor callers
    pub distributor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub id: Uuid,
    pub distributor_id: Uuid,
    pub stock_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub variant_size: String,
    pub quantity_returned: i32,
    pub reason: String,
    pub status: String,
    pub decision_note: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ReturnRow> for ReturnResponse {
    fn from(row: ReturnRow) -> Self {
        Self {
            id: row.stock_return.id,
            distributor_id: row.stock_return.distributor_id,
            stock_id: row.stock_return.stock_id,
            product_id: row.stock_return.product_id,
            product_name: row.product_name,
            variant_size: row.stock_return.variant_size,
            quantity_returned: row.stock_return.quantity_returned,
            reason: row.stock_return.reason,
            status: row.stock_return.status,
            decision_note: row.stock_return.decision_note,
            decided_at: row.stock_return.decided_at,
            created_at: row.stock_return.created_at,
            updated_at: row.stock_return.updated_at,
        }
    }
}

/// Submitting a return draws the quantity out of the distributor's stock
/// immediately; the decision later settles it to the warehouse or back.
pub async fn create_return(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateReturnInput>,
) -> Result<(StatusCode, Json<ApiResponse<ReturnResponse>>), ServiceError> {
    let distributor_id = require_distributor(&auth_user)?;
    let created = state
        .services
        .returns
        .create_return(distributor_id, payload)
        .await?;
    let row = state
        .services
        .returns
        .get_return(created.id, Some(distributor_id))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReturnResponse::from(row))),
    ))
}

pub async fn list_returns(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ReturnListQuery>,
) -> ApiResult<PaginatedResponse<ReturnResponse>> {
    let scope = visibility_scope(&auth_user)?;
    let page = page_or_first(query.page);
    let limit = clamp_limit(&state.config, query.limit);
    let filter = ReturnFilter {
        status: query.status,
        distributor_id: query.distributor_id,
    };

    let (rows, total) = state
        .services
        .returns
        .list_returns(scope, filter, page, limit)
        .await?;
    let items: Vec<ReturnResponse> = rows.into_iter().map(ReturnResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

pub async fn get_return(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ReturnResponse> {
    let scope = visibility_scope(&auth_user)?;
    let row = state.services.returns.get_return(id, scope).await?;
    Ok(Json(ApiResponse::success(ReturnResponse::from(row))))
}

/// Approve moves the quantity into the central warehouse; reject hands it
/// back to the distributor's stock.
pub async fn decide_return(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReturnDecisionInput>,
) -> ApiResult<ReturnResponse> {
    require_admin(&auth_user)?;
    let decided = state.services.returns.decide_return(id, payload).await?;
    let row = state.services.returns.get_return(decided.id, None).await?;
    Ok(Json(ApiResponse::success(ReturnResponse::from(row))))
}
