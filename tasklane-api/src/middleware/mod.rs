/// Middleware for the API server
///
/// - `security`: security response headers
/// - `auth`: token authentication for `/api` routes

pub mod auth;
pub mod security;
