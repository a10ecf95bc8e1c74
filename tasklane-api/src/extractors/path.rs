//! Path parameter extractor with JSON rejections.

use axum::{extract::FromRequestParts, extract::Path};

use crate::error::ApiError;

/// `Path<T>` whose rejection is an [`ApiError::BadRequest`]
///
/// A non-UUID id in `/api/projects/:id` therefore returns a JSON 400 instead
/// of axum's plain-text response.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
