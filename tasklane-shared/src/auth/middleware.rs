/// Request authentication
///
/// Turns the credentials on an incoming request into an [`AuthContext`]
/// exactly once per request. Handlers receive the context as a request
/// extension and never look at headers or cookies themselves.
///
/// # Token transport
///
/// 1. `Authorization: Bearer <token>` header
/// 2. `Authorization` cookie set by the login endpoint
///
/// The header wins when both are present.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use tasklane_shared::auth::middleware::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let auth = authenticate(&pool, "jwt-secret-at-least-32-bytes-long", &headers).await?;
/// println!("request from {}", auth.email);
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::User;

/// Name of the cookie carrying the session token
pub const AUTH_COOKIE: &str = "Authorization";

/// Identity of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Authentication failures
///
/// Everything except a database failure maps to a 401. The response never
/// says which check failed beyond a short reason.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token was valid but its user no longer exists or was deleted
    #[error("Unknown user")]
    UnknownUser,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Pulls the raw token out of the request headers
///
/// A present but non-Bearer `Authorization` header is an error rather than a
/// fall through to the cookie.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

        return Ok(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

/// Verifies the request's token and resolves it to a live user
///
/// Fails closed: a bad signature, wrong algorithm, expiry, foreign issuer or
/// a deleted user all produce an error.
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers)?;
    let claims = validate_token(&token, secret)?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from_user(&user))
}
