/// Project-level authorization
///
/// # Permission Model
///
/// A caller's role in a project is resolved as:
///
/// 1. **OWNER** if the caller is the project's `owner_id`
/// 2. otherwise the role stored in the caller's membership row
/// 3. otherwise no role
///
/// The owner is always implicitly a member, with or without a membership row.
///
/// | Action | Required |
/// |---|---|
/// | view project, list/create tasks, assign/unassign | member |
/// | update/delete project, add/remove members | owner |
/// | update/delete any field of a task | task creator or owner |
/// | change only the status of a task | any assignee |
///
/// The pure functions ([`resolve_role`], [`task_edit_access`]) carry the
/// rules; the async helpers load the facts they need and apply them.
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::auth::authorization::{require_member, require_owner};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let project = require_member(&pool, project_id, user_id).await?;
/// require_owner(&pool, project.id, user_id).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    project::Project,
    project_member::{ProjectMember, ProjectRole},
    task::{Task, UpdateTask},
    task_assignee::TaskAssignee,
};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Project does not exist or was deleted
    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),

    /// Caller has no role in the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// Caller's role is below what the action needs
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole {
        required: ProjectRole,
        actual: ProjectRole,
    },

    /// Caller may not perform this action on the resource
    #[error("{0}")]
    NotAuthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// What a caller may change on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEditAccess {
    /// Creator or project owner: every field
    Full,

    /// Assignee only: the `status` field
    StatusOnly,

    Denied,
}

impl TaskEditAccess {
    /// Whether `update` is within this access level
    pub fn permits(&self, update: &UpdateTask) -> bool {
        match self {
            TaskEditAccess::Full => true,
            TaskEditAccess::StatusOnly => update.is_status_only(),
            TaskEditAccess::Denied => false,
        }
    }
}

/// Effective role of `user_id` in a project
///
/// `member_role` is the role from the user's membership row, if any.
pub fn resolve_role(
    owner_id: Option<Uuid>,
    member_role: Option<ProjectRole>,
    user_id: Uuid,
) -> Option<ProjectRole> {
    if owner_id == Some(user_id) {
        return Some(ProjectRole::Owner);
    }

    member_role
}

/// Edit rights of `user_id` on `task`
///
/// `role` is the user's effective project role and `is_assignee` whether the
/// user is assigned to the task.
pub fn task_edit_access(
    task: &Task,
    role: Option<ProjectRole>,
    is_assignee: bool,
    user_id: Uuid,
) -> TaskEditAccess {
    if role.is_none() {
        return TaskEditAccess::Denied;
    }

    if task.creator_id == user_id || role == Some(ProjectRole::Owner) {
        TaskEditAccess::Full
    } else if is_assignee {
        TaskEditAccess::StatusOnly
    } else {
        TaskEditAccess::Denied
    }
}

/// Loads a live project or fails with [`AuthzError::ProjectNotFound`]
pub async fn load_project(pool: &PgPool, project_id: Uuid) -> Result<Project, AuthzError> {
    Project::find_by_id(pool, project_id)
        .await?
        .ok_or(AuthzError::ProjectNotFound(project_id))
}

/// Effective role of a user in an already-loaded project
pub async fn role_in(
    pool: &PgPool,
    project: &Project,
    user_id: Uuid,
) -> Result<Option<ProjectRole>, sqlx::Error> {
    if project.is_owned_by(user_id) {
        return Ok(Some(ProjectRole::Owner));
    }

    let member_role = ProjectMember::get_role(pool, project.id, user_id).await?;
    Ok(resolve_role(project.owner_id, member_role, user_id))
}

/// Effective role of a user in a project; `None` means no role
///
/// # Errors
///
/// [`AuthzError::ProjectNotFound`] if the project is absent or deleted.
pub async fn role_of(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ProjectRole>, AuthzError> {
    let project = load_project(pool, project_id).await?;
    Ok(role_in(pool, &project, user_id).await?)
}

pub async fn is_member(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, AuthzError> {
    Ok(role_of(pool, project_id, user_id).await?.is_some())
}

/// Requires any role in the project and returns the project with that role
pub async fn require_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    required: ProjectRole,
) -> Result<(Project, ProjectRole), AuthzError> {
    let project = load_project(pool, project_id).await?;

    let role = role_in(pool, &project, user_id)
        .await?
        .ok_or(AuthzError::NotMember(project_id))?;

    if !role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: role,
        });
    }

    Ok((project, role))
}

/// Requires membership; returns the live project
pub async fn require_member(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Project, AuthzError> {
    require_role(pool, project_id, user_id, ProjectRole::Member)
        .await
        .map(|(project, _)| project)
}

/// Requires the OWNER role; returns the live project
pub async fn require_owner(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Project, AuthzError> {
    require_role(pool, project_id, user_id, ProjectRole::Owner)
        .await
        .map(|(project, _)| project)
}

/// Whether the user may manage the project's members (OWNER only)
pub async fn can_manage_members(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<bool, AuthzError> {
    Ok(role_of(pool, project_id, user_id)
        .await?
        .map_or(false, |role| role.can_manage_members()))
}

/// Edit rights of a user on a task, loading role and assignment
pub async fn task_access(
    pool: &PgPool,
    task: &Task,
    user_id: Uuid,
) -> Result<TaskEditAccess, AuthzError> {
    let role = role_of(pool, task.project_id, user_id).await?;
    if role.is_none() {
        return Ok(TaskEditAccess::Denied);
    }

    let is_assignee = TaskAssignee::is_assigned(pool, task.id, user_id).await?;
    Ok(task_edit_access(task, role, is_assignee, user_id))
}

/// Whether the user may modify every field of, or delete, the task
pub async fn can_modify_task(pool: &PgPool, task: &Task, user_id: Uuid) -> Result<bool, AuthzError> {
    let role = role_of(pool, task.project_id, user_id).await?;
    Ok(task_edit_access(task, role, false, user_id) == TaskEditAccess::Full)
}
