use axum::{extract::State, response::Json};
use serde_json::json;

use crate::auth::AuthUser;
use crate::handlers::common::require_distributor;
use crate::handlers::distributors::DistributorResponse;
use crate::services::profile::{ChangePasswordInput, UpdateProfileInput};
use crate::{ApiResponse, ApiResult, AppState};

/// The caller's own distributor account.
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<DistributorResponse> {
    let distributor_id = require_distributor(&auth_user)?;
    let profile = state.services.profile.get_profile(distributor_id).await?;
    Ok(Json(ApiResponse::success(DistributorResponse::from(profile))))
}

/// Contact and shopfront details only; the login email is not editable here.
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileInput>,
) -> ApiResult<DistributorResponse> {
    let distributor_id = require_distributor(&auth_user)?;
    let updated = state
        .services
        .profile
        .update_profile(distributor_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(DistributorResponse::from(updated))))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<ChangePasswordInput>,
) -> ApiResult<serde_json::Value> {
    let distributor_id = require_distributor(&auth_user)?;
    state
        .services
        .profile
        .change_password(distributor_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(json!({
        "changed": true,
    }))))
}
