pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, normalize_path::NormalizePath, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;

pub use crate::error::ApiError;

/// Build the full application service.
///
/// Trailing slashes are trimmed before routing, so `/api/plans/` reaches `/api/plans`.
pub fn app(state: AppState, config: &AppConfig) -> NormalizePath<Router> {
    let router = Router::new()
        // Public
        .route("/health", get(health))
        .merge(user_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    NormalizePath::trim_trailing_slash(router)
}

fn user_public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/api/users/register", post(public::register))
        .route("/api/users/login", post(public::login))
        .route("/api/users/logout", post(public::logout))
        .route("/api/users/refresh-token", post(public::refresh_token))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{plans, users};

    Router::new()
        .route("/api/users/protected", get(users::protected))
        .route(
            "/api/plans",
            get(plans::get)
                .post(plans::create)
                .patch(plans::update)
                .delete(plans::delete),
        )
        .route_layer(from_fn_with_state(state, middleware::bearer_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
