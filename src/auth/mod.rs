/*!
 * # Authentication
 *
 * Bearer-token verification for the endpoints that write data. Tokens are
 * HS256 JWTs issued elsewhere and signed with the configured `jwt_secret`;
 * this module only verifies them and exposes the caller as [`AuthUser`].
 * Searches and lookups are public.
 */

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::errors::ErrorResponse;
use crate::AppState;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub name: Option<String>,  // User's name
    pub email: Option<String>, // User's email
    #[serde(default)]
    pub roles: Vec<String>, // e.g. CLIENT, GYM_ADMIN, PT_USER, ADMIN
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
}

impl Claims {
    /// Claims for `user_id` valid for `ttl` from now.
    pub fn for_user(user_id: i64, roles: Vec<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            name: None,
            email: None,
            roles,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "No authentication token provided".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "Token has expired".to_string()),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Token creation failed".to_string(),
            ),
        };
        (status, Json(ErrorResponse::for_status(status, message))).into_response()
    }
}

/// Validate a JWT token and extract the claims
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })
}

/// Signs claims with HS256. Used by development tooling and tests; the
/// service itself never issues tokens.
pub fn encode_token(secret: &str, claims: &Claims) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenCreation(e.to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidToken)?;

        let claims = decode_token(&state.config.jwt_secret, token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            e
        })?;
        AuthUser::try_from(claims)
    }
}
