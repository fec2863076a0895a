use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::revocation::RevocationList;
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::database::{filter, DatabaseError, Repository, ID_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub token_type: TokenKind,
    /// Token id, used for revocation
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(subject_id: &str, username: &str, token_type: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: subject_id.to_string(),
            username: username.to_string(),
            token_type,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token lifetime: {0}")]
    InvalidLifetime(String),

    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token has expired")]
    Expired,

    #[error("Expected {expected} token, got {found}")]
    WrongKind { expected: TokenKind, found: TokenKind },

    #[error("Token has been revoked")]
    Revoked,

    #[error("User not found")]
    SubjectNotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Issues and validates HS256 session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    revocations: Option<RevocationList>,
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Result<Self, TokenError> {
        if security.jwt_secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let secret = security.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl: lifetime("access", security.access_token_ttl_minutes, Duration::try_minutes)?,
            refresh_ttl: lifetime("refresh", security.refresh_token_ttl_hours, Duration::try_hours)?,
            revocations: security.enable_token_revocation.then(RevocationList::new),
        })
    }

    pub fn revocation_enabled(&self) -> bool {
        self.revocations.is_some()
    }

    /// Issue an access/refresh pair for a subject.
    pub fn issue(&self, subject_id: &str, username: &str) -> Result<TokenPair, TokenError> {
        let access = Claims::new(subject_id, username, TokenKind::Access, self.access_ttl);
        let refresh = Claims::new(subject_id, username, TokenKind::Refresh, self.refresh_ttl);

        Ok(TokenPair {
            access: self.sign(&access)?,
            refresh: self.sign(&refresh)?,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verify signature and expiry only.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// Validate and additionally require the given kind and an unrevoked id.
    pub async fn authenticate(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.validate(token)?;

        if claims.token_type != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.token_type,
            });
        }

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(&claims.jti).await {
                return Err(TokenError::Revoked);
            }
        }

        Ok(claims)
    }

    /// Exchange a refresh token for a new pair, provided its subject still exists.
    ///
    /// With revocation enabled the presented token is spent before the subject lookup, so
    /// concurrent exchanges of one token yield at most one new pair.
    pub async fn refresh(&self, refresh_token: &str, users: &Repository<User>) -> Result<TokenPair, TokenError> {
        let claims = self.authenticate(refresh_token, TokenKind::Refresh).await?;

        if let Some(revocations) = &self.revocations {
            if !revocations.revoke_once(claims.jti, claims.exp).await {
                return Err(TokenError::Revoked);
            }
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| TokenError::Invalid("subject is not a valid user id".to_string()))?;

        let user = users
            .select_one(&filter([(ID_FIELD, json!(user_id))]))
            .await?
            .ok_or(TokenError::SubjectNotFound)?;

        self.issue(&user.id.to_string(), &user.username)
    }

    pub async fn revoke(&self, claims: &Claims) {
        if let Some(revocations) = &self.revocations {
            revocations.revoke(claims.jti, claims.exp).await;
        }
    }
}

/// Positive lifetime that also keeps `now + ttl` inside the representable date range
fn lifetime(name: &str, amount: u64, unit: fn(i64) -> Option<Duration>) -> Result<Duration, TokenError> {
    i64::try_from(amount)
        .ok()
        .filter(|amount| *amount > 0)
        .and_then(unit)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| TokenError::InvalidLifetime(format!("{} token lifetime {} is out of range", name, amount)))
}
