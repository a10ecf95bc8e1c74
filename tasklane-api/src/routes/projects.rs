/// Project endpoints
///
/// - `POST /api/projects` - Create a project; the caller becomes its owner
/// - `GET /api/projects` - The caller's projects with members and tasks
/// - `GET /api/projects/:id` - One project with members and tasks
/// - `PUT /api/projects/:id` - Partial update (owner only)
/// - `DELETE /api/projects/:id` - Soft delete (owner only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ApiPath, ValidatedJson},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tasklane_shared::{
    auth::{authorization, middleware::AuthContext},
    models::project::{CreateProject, Project, ProjectDetails, UpdateProject},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub project: Project,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailsResponse {
    pub project: ProjectDetails,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectDetails>,
}

/// Create a project
///
/// The project and the caller's OWNER membership are written together.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name cannot be blank".to_string()));
    }

    let project = Project::create_with_owner(
        &state.db,
        CreateProject {
            name: req.name,
            description: req.description,
        },
        auth.user_id,
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(ProjectResponse { project })))
}

/// List the caller's live projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProjectListResponse>> {
    let projects = Project::list_for_user(&state.db, auth.user_id).await?;
    let projects = Project::load_details_many(&state.db, projects).await?;

    Ok(Json(ProjectListResponse { projects }))
}

/// Show a project
///
/// # Errors
///
/// - `404 Not Found`: absent or deleted
/// - `403 Forbidden`: caller is not a member
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectDetailsResponse>> {
    let project = authorization::require_member(&state.db, project_id, auth.user_id).await?;
    let project = project.load_details(&state.db).await?;

    Ok(Json(ProjectDetailsResponse { project }))
}

/// Update name and/or description (owner only)
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    authorization::require_owner(&state.db, project_id, auth.user_id).await?;
    req.validate()?;

    let update = UpdateProject {
        name: req.name,
        description: req.description,
    };

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("Project name cannot be blank".to_string()));
    }

    let project = Project::update(&state.db, project_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project updated");

    Ok(Json(ProjectResponse { project }))
}

/// Soft-delete a project (owner only)
///
/// Its tasks become unreachable with it.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    authorization::require_owner(&state.db, project_id, auth.user_id).await?;

    if !Project::soft_delete(&state.db, project_id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %project_id, user_id = %auth.user_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}
