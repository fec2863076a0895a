// handlers/public/users.rs - Account and session endpoints that need no token

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{PasswordError, TokenKind, TokenPair};
use crate::database::models::{NewUser, UserSummary};
use crate::database::{filter, DatabaseError};
use crate::error::ApiError;
use crate::handlers::{require_fields, MessageResponse};
use crate::middleware::auth::extract_bearer_token;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: UserSummary,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserSummary,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// POST /api/users/register - Create a new account
///
/// Expected Input:
/// ```json
/// { "username": "alice", "email": "a@x.com", "password": "pw1" }
/// ```
///
/// Expected Output (201):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "message": "Registration successful!",
///     "user": { "id": "uuid", "username": "alice", "email": "a@x.com" }
///   }
/// }
/// ```
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(payload) = payload?;
    let [username, email, password] = require_fields(
        "All fields are required!",
        [
            ("username", &payload.username),
            ("email", &payload.email),
            ("password", &payload.password),
        ],
    )?;

    let users = state.users();
    if users.select_one(&filter([("username", json!(username))])).await?.is_some() {
        return Err(ApiError::conflict("This username is already taken!"));
    }

    let password_hash = state.passwords.hash(password).await?;
    let new_user = NewUser {
        username,
        email,
        password_hash: &password_hash,
    };

    // A concurrent registration can still win the race; the unique index reports it
    let id = users.insert(&new_user).await.map_err(|e| match e {
        DatabaseError::Duplicate(_) => ApiError::conflict("This username is already taken!"),
        other => other.into(),
    })?;

    tracing::info!("Registered user '{}' ({})", username, id);

    Ok(ApiResponse::created(RegisterResponse {
        message: "Registration successful!",
        user: UserSummary {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
        },
    }))
}

/// POST /api/users/login - Exchange credentials for an access/refresh pair
///
/// Unknown usernames and wrong passwords produce the same response.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload?;
    let [username, password] = require_fields(
        "Username and password are required",
        [("username", &payload.username), ("password", &payload.password)],
    )?;

    let Some(user) = state.users().select_one(&filter([("username", json!(username))])).await? else {
        tracing::warn!("Login failed: unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    let matched = match state.passwords.verify(password, &user.password_hash).await {
        Ok(matched) => matched,
        Err(PasswordError::Hash(e)) => {
            tracing::warn!("Stored password hash for user {} is unreadable: {}", user.id, e);
            false
        }
        Err(e) => return Err(e.into()),
    };

    if !matched {
        tracing::warn!("Login failed: wrong password for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    let tokens = state.tokens.issue(&user.id.to_string(), &user.username)?;

    Ok(ApiResponse::success(LoginResponse {
        message: "Login successful!",
        tokens,
        user: user.summary(),
    }))
}

/// POST /api/users/logout - Always acknowledges.
///
/// With token revocation enabled, a valid bearer access token and a valid `refresh`
/// body token are revoked. Anything invalid is ignored.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> ApiResponse<MessageResponse> {
    if state.tokens.revocation_enabled() {
        if let Ok(Some(access)) = extract_bearer_token(&headers) {
            if let Ok(claims) = state.tokens.authenticate(&access, TokenKind::Access).await {
                state.tokens.revoke(&claims).await;
            }
        }

        let refresh = payload.and_then(|Json(body)| body.refresh);
        if let Some(refresh) = refresh {
            if let Ok(claims) = state.tokens.authenticate(&refresh, TokenKind::Refresh).await {
                state.tokens.revoke(&claims).await;
            }
        }
    }

    ApiResponse::success(MessageResponse {
        message: "Logout successful!",
    })
}

/// POST /api/users/refresh-token - Rotate a refresh token into a new pair
///
/// Expected Input:
/// ```json
/// { "refresh": "eyJhbGciOiJIUzI1NiI..." }
/// ```
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<TokenPair> {
    let Json(payload) = payload?;
    let [refresh] = require_fields("Refresh token is required", [("refresh", &payload.refresh)])?;

    let tokens = state.tokens.refresh(refresh, &state.users()).await?;
    Ok(ApiResponse::success(tokens))
}
