//! JSON body extractor that rejects with [`ApiError`].

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Deserializes the body as JSON without running `validator` rules
///
/// Handlers gated on a project role take this instead of
/// [`super::ValidatedJson`] and call `validate()` after the role check, so a
/// caller without access gets 403 whatever the body holds. A body that is not
/// JSON at all is still a 400.
///
/// ```rust,ignore
/// async fn update(ApiJson(req): ApiJson<UpdateTaskRequest>) {
///     // authorize, then
///     req.validate()?;
/// }
/// ```
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}
