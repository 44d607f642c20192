use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::message;
use crate::errors::ServiceError;
use crate::handlers::common::require_distributor;
use crate::services::messages::{MessageAuthor, MessageType};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub admin_id: Option<Uuid>,
    pub body: String,
    pub message_type: String,
    pub sender: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<message::Model> for MessageResponse {
    fn from(model: message::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            admin_id: model.admin_id,
            body: model.body,
            message_type: model.message_type,
            sender: model.sender,
            is_read: model.is_read,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Body must be between 1 and 2000 characters"))]
    pub body: String,
    /// Defaults to "question"; accept/reject notices cannot be posted directly
    pub message_type: Option<MessageType>,
}

fn message_author(auth: &AuthUser) -> Result<MessageAuthor, ServiceError> {
    if auth.is_admin() {
        Ok(MessageAuthor::Admin(auth.account_id()?))
    } else {
        Ok(MessageAuthor::Distributor(auth.account_id()?))
    }
}

pub async fn list_order_messages(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Vec<MessageResponse>> {
    let author = message_author(&auth_user)?;
    let messages = state.services.messages.list_messages(author, order_id).await?;
    Ok(Json(ApiResponse::success(
        messages.into_iter().map(MessageResponse::from).collect(),
    )))
}

pub async fn post_order_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ServiceError> {
    payload.validate()?;
    let author = message_author(&auth_user)?;
    let message_type = payload.message_type.unwrap_or(MessageType::Question);

    let created = state
        .services
        .messages
        .post_message(author, order_id, payload.body, message_type)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::from(created))),
    ))
}

/// Marks the counterparty's messages on the order as read.
pub async fn mark_order_messages_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let author = message_author(&auth_user)?;
    let marked = state.services.messages.mark_read(author, order_id).await?;
    Ok(Json(ApiResponse::success(json!({
        "order_id": order_id,
        "marked_read": marked,
    }))))
}

/// Unread admin messages across all of the caller's orders. Drives the
/// notification badge in the distributor portal.
pub async fn unread_message_count(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<serde_json::Value> {
    let distributor_id = require_distributor(&auth_user)?;
    let unread = state.services.messages.unread_count(distributor_id).await?;
    Ok(Json(ApiResponse::success(json!({ "unread": unread }))))
}
