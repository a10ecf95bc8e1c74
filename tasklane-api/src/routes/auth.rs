/// Authentication endpoints
///
/// - `POST /api/signup` - Create an account
/// - `POST /api/login` - Issue a token (JSON body and `Authorization` cookie)
/// - `POST /api/logout` - Clear the cookie
/// - `GET /api/validate` - Caller identity, projects and assigned tasks
///
/// Tokens are stateless and live for 24 hours. Logout only removes the cookie;
/// a copied token stays valid until it expires.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extractors::ValidatedJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tasklane_shared::{
    auth::{
        jwt::{self, Claims},
        middleware::{AuthContext, AUTH_COOKIE},
        password,
    },
    models::{
        project::{Project, ProjectWithRole},
        project_member::ProjectRole,
        task::{Task, TaskWithAssignees},
        user::{normalize_email, CreateUser, User},
    },
};
use validator::Validate;

/// Same body for unknown email and wrong password
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2 to 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked again by `validate_password_strength`
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// HS256 token, also set as the `Authorization` cookie
    pub token: String,

    pub user: User,

    /// Whether the user owns at least one live project
    pub owns_projects: bool,
}

/// Validate response
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub user: User,

    /// Live projects the caller belongs to, with the caller's role
    pub projects: Vec<ProjectWithRole>,

    /// Live tasks assigned to the caller
    pub tasks: Vec<TaskWithAssignees>,
}

/// Create an account
///
/// # Endpoint
///
/// ```text
/// POST /api/signup
/// Content-Type: application/json
///
/// { "name": "Alice", "email": "alice@example.com", "password": "S3cure!pass" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or weak password
/// - `409 Conflict`: email already registered
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    password::validate_password_strength(&req.password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new("password", message)])
    })?;

    let email = normalize_email(&req.email);

    if User::email_taken(&state.db, &email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // A concurrent signup can still hit users_email_key; that maps to 409 too
    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Issue a token
///
/// # Endpoint
///
/// ```text
/// POST /api/login
/// Content-Type: application/json
///
/// { "email": "alice@example.com", "password": "S3cure!pass" }
/// ```
///
/// The response sets `Authorization=<token>; HttpOnly; SameSite=Lax; Path=/`,
/// plus `Secure` in production.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (same body)
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let user = match User::find_by_email(&state.db, &req.email).await? {
        Some(user) => user,
        None => {
            // Unknown accounts still pay for one hash so timing matches a wrong password
            password::verify_password(&req.password, password::UNMATCHABLE_HASH)?;
            tracing::debug!("Login rejected: unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = jwt::create_token(&Claims::new(user.id), state.jwt_secret())?;

    if let Err(e) = User::update_last_login(&state.db, user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to record last login");
    }

    let owns_projects = Project::list_with_role(&state.db, user.id)
        .await?
        .iter()
        .any(|p| p.role == ProjectRole::Owner);

    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.api.production);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user,
            owns_projects,
        }),
    ))
}

/// Clear the token cookie
pub async fn logout(
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    tracing::info!(user_id = %auth.user_id, "User logged out");

    (
        jar.remove(Cookie::build(AUTH_COOKIE).path("/")),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

/// Caller identity with memberships and assigned tasks
pub async fn validate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ValidateResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let projects = Project::list_with_role(&state.db, user.id).await?;

    let assigned = Task::list_assigned_to_user(&state.db, user.id).await?;
    let tasks = Task::attach_assignees(&state.db, assigned).await?;

    Ok(Json(ValidateResponse {
        user,
        projects,
        tasks,
    }))
}
