use axum::extract::State;
use serde::Serialize;
use serde_json::json;

use crate::database::{filter, ID_FIELD};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub message: &'static str,
    pub user: String,
}

/// GET /api/users/protected - Round-trip check that a token resolves to a live user
pub async fn protected(State(state): State<AppState>, principal: Principal) -> ApiResult<ProtectedResponse> {
    let user_id = principal.user_id()?;

    let user = state
        .users()
        .select_one(&filter([(ID_FIELD, json!(user_id))]))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(ProtectedResponse {
        message: "Protected endpoint reached",
        user: user.username,
    }))
}
