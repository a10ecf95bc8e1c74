/// Project membership endpoints (owner only)
///
/// - `POST /api/projects/:id/members` - Add a member or change a member's role
/// - `DELETE /api/projects/:id/members/:user_id` - Remove a member
///
/// The project owner always keeps the OWNER role and cannot be removed.
/// Removing a member leaves their task assignments in place.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ApiPath},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tasklane_shared::{
    auth::{authorization, middleware::AuthContext},
    models::{
        project_member::{ProjectMember, ProjectRole},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    /// Defaults to MEMBER
    pub role: Option<ProjectRole>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member: ProjectMember,
}

/// Path of the remove-member route
#[derive(Debug, Deserialize)]
pub struct MemberPath {
    pub id: Uuid,
    pub user_id: Uuid,
}

/// Add a member, or update the role of an existing one
///
/// # Errors
///
/// - `404 Not Found`: project or target user does not exist
/// - `403 Forbidden`: caller is not the project owner
/// - `400 Bad Request`: attempt to give the project owner another role
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let project = authorization::require_owner(&state.db, project_id, auth.user_id).await?;
    req.validate()?;

    if User::find_by_id(&state.db, req.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let role = req.role.unwrap_or_default();

    if project.is_owned_by(req.user_id) && role != ProjectRole::Owner {
        return Err(ApiError::BadRequest(
            "The project owner's role cannot be changed".to_string(),
        ));
    }

    let member = ProjectMember::upsert(&state.db, project.id, req.user_id, role).await?;

    tracing::info!(
        project_id = %project.id,
        user_id = %req.user_id,
        role = %role,
        "Project member added"
    );

    Ok(Json(MemberResponse { member }))
}

/// Remove a member
///
/// # Errors
///
/// - `403 Forbidden`: caller is not the owner, or the target is the owner
/// - `404 Not Found`: project absent, or target is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(path): ApiPath<MemberPath>,
) -> ApiResult<StatusCode> {
    let project = authorization::require_owner(&state.db, path.id, auth.user_id).await?;

    if project.is_owned_by(path.user_id) {
        return Err(ApiError::Forbidden(
            "The project owner cannot be removed".to_string(),
        ));
    }

    if !ProjectMember::delete(&state.db, project.id, path.user_id).await? {
        return Err(ApiError::NotFound(
            "User is not a member of this project".to_string(),
        ));
    }

    tracing::info!(project_id = %project.id, user_id = %path.user_id, "Project member removed");

    Ok(StatusCode::NO_CONTENT)
}
