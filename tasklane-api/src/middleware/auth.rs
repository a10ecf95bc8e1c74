//! Token authentication for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tasklane_shared::auth::middleware::authenticate;

use crate::{app::AppState, error::ApiError};

/// Resolves the caller and stores the `AuthContext` in request extensions
///
/// Handlers behind this layer take `Extension<AuthContext>`; they are never
/// reached without a verified, live user.
pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(&state.db, state.jwt_secret(), req.headers())
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, path = %req.uri().path(), "Authentication failed");
            ApiError::from(e)
        })?;

    tracing::Span::current().record("user_id", tracing::field::display(auth.user_id));
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
