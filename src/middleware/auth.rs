use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::TokenKind;
use crate::error::ApiError;
use crate::state::AppState;

/// Something that is identified by a subject id
pub trait Subject {
    fn subject_id(&self) -> &str;
}

/// Authenticated caller resolved from a validated access token.
///
/// Carries only the opaque subject id; token internals never reach handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    subject_id: String,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
        }
    }

    /// The subject id as a user id. Malformed ids are a validation failure.
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        Uuid::parse_str(&self.subject_id)
            .map_err(|_| ApiError::validation_error("Invalid user ID format", None))
    }
}

impl Subject for Principal {
    fn subject_id(&self) -> &str {
        &self.subject_id
    }
}

/// Handlers that take a `Principal` require authentication
#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))
    }
}

/// Bearer token middleware.
///
/// No credential means an anonymous request passes through untouched. A credential that
/// fails validation stops the request with 401 before any handler runs.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match extract_bearer_token(request.headers()) {
        Ok(Some(token)) => token,
        Ok(None) => return Ok(next.run(request).await),
        Err(msg) => {
            tracing::warn!("Rejected authorization header: {}", msg);
            return Err(ApiError::unauthorized(msg));
        }
    };

    let claims = state.tokens.authenticate(&token, TokenKind::Access).await?;

    tracing::debug!("Authenticated subject {}", claims.sub);
    request.extensions_mut().insert(Principal::new(claims.sub));

    Ok(next.run(request).await)
}

/// Extract a bearer credential.
///
/// `Ok(None)` for a missing header or a different scheme, `Err` for a malformed bearer value.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    let mut parts = auth_str.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {}
        _ => return Ok(None),
    }

    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(Some(token.to_string())),
        (None, _) => Err("Authorization header must contain a token".to_string()),
        (Some(_), Some(_)) => Err("Authorization header must not contain spaces".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def.ghi")), Ok(Some("abc.def.ghi".to_string())));
        assert_eq!(extract_bearer_token(&headers("bearer abc")), Ok(Some("abc".to_string())));
    }

    #[test]
    fn missing_or_foreign_scheme_is_anonymous() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), Ok(None));
        assert_eq!(extract_bearer_token(&headers("Basic dXNlcjpwdw==")), Ok(None));
    }

    #[test]
    fn malformed_bearer_is_rejected() {
        assert!(extract_bearer_token(&headers("Bearer")).is_err());
        assert!(extract_bearer_token(&headers("Bearer a b")).is_err());
    }

    #[test]
    fn principal_user_id_requires_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(Principal::new(id.to_string()).user_id().unwrap(), id);
        assert!(Principal::new("not-a-uuid").user_id().is_err());
        assert_eq!(Principal::new("opaque").subject_id(), "opaque");
    }
}
