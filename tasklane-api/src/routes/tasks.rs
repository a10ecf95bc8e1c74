/// Task endpoints
///
/// - `POST /api/projects/:id/tasks` - Create a task (member)
/// - `GET /api/projects/:id/tasks` - List a project's tasks (member)
/// - `GET /api/tasks/:id` - Show a task (member)
/// - `PUT /api/tasks/:id` - Update (creator or owner; assignees: status only)
/// - `DELETE /api/tasks/:id` - Soft delete (creator or owner)
/// - `PUT /api/tasks/:id/assign` - Assign members
/// - `PUT /api/tasks/:id/unassign` - Remove an assignee
///
/// Tasks of a deleted project answer 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ApiPath},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasklane_shared::{
    auth::{
        authorization::{self, TaskEditAccess},
        middleware::AuthContext,
    },
    models::{
        task::{CreateTask, Task, TaskPriority, TaskStatus, TaskWithAssignees, UpdateTask},
        task_assignee::TaskAssignee,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to TODO
    pub status: Option<TaskStatus>,

    /// Defaults to MEDIUM
    pub priority: Option<TaskPriority>,

    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    pub due_date: Option<DateTime<Utc>>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        }
    }
}

/// Assign request; `user_id`, `user_ids` or both
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    pub user_id: Option<Uuid>,

    #[validate(length(max = 100, message = "At most 100 users per request"))]
    pub user_ids: Option<Vec<Uuid>>,
}

impl AssignRequest {
    /// Requested users, deduplicated, in request order
    pub fn targets(&self) -> Vec<Uuid> {
        let mut targets: Vec<Uuid> = Vec::new();
        let requested = self
            .user_id
            .iter()
            .chain(self.user_ids.iter().flatten());

        for user_id in requested {
            if !targets.contains(user_id) {
                targets.push(*user_id);
            }
        }
        targets
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnassignRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: TaskWithAssignees,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskWithAssignees>,
}

async fn load_task(state: &AppState, task_id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Create a task in a project
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    authorization::require_member(&state.db, project_id, auth.user_id).await?;
    req.validate()?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title cannot be blank".to_string()));
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id,
            creator_id: auth.user_id,
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        },
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        project_id = %project_id,
        user_id = %auth.user_id,
        status = %task.status,
        priority = %task.priority,
        "Task created"
    );

    let task = task.with_assignees(&state.db).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse { task })))
}

/// List a project's tasks with their assignees
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskListResponse>> {
    authorization::require_member(&state.db, project_id, auth.user_id).await?;

    let tasks = Task::list_by_project_with_assignees(&state.db, project_id).await?;

    Ok(Json(TaskListResponse { tasks }))
}

/// Show a task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = load_task(&state, task_id).await?;
    authorization::require_member(&state.db, task.project_id, auth.user_id).await?;

    let task = task.with_assignees(&state.db).await?;
    Ok(Json(TaskResponse { task }))
}

/// Update a task
///
/// Status transitions are free-form.
///
/// # Errors
///
/// - `403 Forbidden`: caller is neither creator, owner nor assignee, or an
///   assignee sent fields other than `status`
/// - `400 Bad Request`: empty update
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = load_task(&state, task_id).await?;
    let access = authorization::task_access(&state.db, &task, auth.user_id).await?;

    if access == TaskEditAccess::Denied {
        return Err(ApiError::Forbidden(
            "Not allowed to modify this task".to_string(),
        ));
    }
    req.validate()?;

    let update = UpdateTask::from(req);

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    if !access.permits(&update) {
        return Err(ApiError::Forbidden(
            "Assignees may only change the task status".to_string(),
        ));
    }
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("Title cannot be blank".to_string()));
    }

    let task = Task::update(&state.db, task.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(
        task_id = %task.id,
        user_id = %auth.user_id,
        access = ?access,
        status = %task.status,
        "Task updated"
    );

    let task = task.with_assignees(&state.db).await?;
    Ok(Json(TaskResponse { task }))
}

/// Soft-delete a task (creator or owner)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let task = load_task(&state, task_id).await?;

    if !authorization::can_modify_task(&state.db, &task, auth.user_id).await? {
        return Err(ApiError::Forbidden(
            "Only the task creator or project owner can delete this task".to_string(),
        ));
    }

    if !Task::soft_delete(&state.db, task.id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Assign one or more project members
///
/// Already-assigned users are skipped. All new assignments are written in one
/// transaction.
///
/// # Errors
///
/// - `400 Bad Request`: no target given, or a target is not a project member
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = load_task(&state, task_id).await?;
    let project = authorization::require_member(&state.db, task.project_id, auth.user_id).await?;
    req.validate()?;

    let targets = req.targets();
    if targets.is_empty() {
        return Err(ApiError::BadRequest(
            "user_id or user_ids is required".to_string(),
        ));
    }

    for user_id in &targets {
        if authorization::role_in(&state.db, &project, *user_id)
            .await?
            .is_none()
        {
            return Err(ApiError::BadRequest(format!(
                "User {} is not a member of this project",
                user_id
            )));
        }
    }

    let created = TaskAssignee::assign_many(&state.db, task.id, &targets).await?;

    tracing::info!(
        task_id = %task.id,
        user_id = %auth.user_id,
        requested = targets.len(),
        created,
        "Task assigned"
    );

    let task = task.with_assignees(&state.db).await?;
    Ok(Json(TaskResponse { task }))
}

/// Remove an assignee; succeeds when the user was not assigned
pub async fn unassign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UnassignRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = load_task(&state, task_id).await?;
    authorization::require_member(&state.db, task.project_id, auth.user_id).await?;
    req.validate()?;

    let removed = TaskAssignee::unassign(&state.db, task.id, req.user_id).await?;

    tracing::info!(
        task_id = %task.id,
        user_id = %auth.user_id,
        target = %req.user_id,
        removed,
        "Task unassigned"
    );

    let task = task.with_assignees(&state.db).await?;
    Ok(Json(TaskResponse { task }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_targets_merge_and_dedupe() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let req = AssignRequest {
            user_id: Some(a),
            user_ids: Some(vec![b, a, b]),
        };

        assert_eq!(req.targets(), vec![a, b]);
    }

    #[test]
    fn test_assign_targets_empty() {
        let req = AssignRequest {
            user_id: None,
            user_ids: Some(vec![]),
        };

        assert!(req.targets().is_empty());
    }

    #[test]
    fn test_update_request_status_only() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"status":"DONE"}"#).unwrap();
        let update = UpdateTask::from(req);

        assert!(update.is_status_only());
        assert_eq!(update.status, Some(TaskStatus::Done));
    }

    #[test]
    fn test_create_request_rejects_unknown_priority() {
        let result: Result<CreateTaskRequest, _> =
            serde_json::from_str(r#"{"title":"Write docs","priority":"URGENT"}"#);

        assert!(result.is_err());
    }

    #[test]
    fn test_create_request_title_length() {
        let req = CreateTaskRequest {
            title: "x".repeat(201),
            description: None,
            status: None,
            priority: None,
            due_date: None,
        };

        assert!(req.validate().is_err());
    }
}
