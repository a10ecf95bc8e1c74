/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, logout and session validation
/// - `projects`: Project CRUD
/// - `members`: Project membership management
/// - `tasks`: Task CRUD and assignment

pub mod auth;
pub mod health;
pub mod members;
pub mod projects;
pub mod tasks;

use crate::error::ApiError;

/// Fallback for unknown routes, so they get a JSON body too
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
