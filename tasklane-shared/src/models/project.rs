/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     owner_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// Deleting a project only sets `deleted_at`. Soft-deleted projects are
/// invisible to every query here and their tasks become unreachable.
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create_with_owner(&pool, CreateProject {
///     name: "Launch".to_string(),
///     description: None,
/// }, user_id).await?;
///
/// let mine = Project::list_for_user(&pool, user_id).await?;
/// assert!(mine.iter().any(|p| p.id == project.id));
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::project_member::{MemberWithUser, ProjectMember, ProjectRole};
use super::task::{Task, TaskWithAssignees};

const PROJECT_COLUMNS: &str =
    "id, name, description, owner_id, created_at, updated_at, deleted_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// `None` only if the owning user row was removed
    pub owner_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// A project with its members and tasks eagerly loaded
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,

    pub members: Vec<MemberWithUser>,

    pub tasks: Vec<TaskWithAssignees>,
}

/// A project seen from one user's side
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectWithRole {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,

    pub role: ProjectRole,
}

impl Project {
    /// Creates a project owned by `owner_id`
    ///
    /// The project row and the owner's OWNER membership row are written in
    /// one transaction; either both exist afterwards or neither does.
    pub async fn create_with_owner(
        pool: &PgPool,
        data: CreateProject,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects (name, description, owner_id) VALUES ($1, $2, $3) RETURNING {}",
            PROJECT_COLUMNS
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(data.name.trim())
            .bind(data.description)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;

        ProjectMember::upsert_in_tx(&mut tx, project.id, owner_id, ProjectRole::Owner).await?;

        tx.commit().await?;

        tracing::debug!(project_id = %project.id, owner_id = %owner_id, "Project created");
        Ok(project)
    }

    /// Finds a live project by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM projects WHERE id = $1 AND deleted_at IS NULL",
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live projects the user owns or belongs to, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        Ok(Self::list_with_role(pool, user_id)
            .await?
            .into_iter()
            .map(|p| p.project)
            .collect())
    }

    /// Live projects of a user together with the user's effective role
    ///
    /// The owner is reported as OWNER even without a membership row.
    pub async fn list_with_role(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, sqlx::Error> {
        sqlx::query_as::<_, ProjectWithRole>(
            r#"
            SELECT p.id, p.name, p.description, p.owner_id, p.created_at, p.updated_at,
                   p.deleted_at,
                   CASE WHEN p.owner_id = $1 THEN 'owner'::project_role ELSE pm.role END AS role
            FROM projects p
            LEFT JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $1
            WHERE p.deleted_at IS NULL
              AND (p.owner_id = $1 OR pm.user_id IS NOT NULL)
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update to a live project
    ///
    /// Returns `None` when the project does not exist or is deleted.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            PROJECT_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        q.fetch_optional(pool).await
    }

    /// Marks the project deleted; false if it was already gone
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads members and tasks (with assignees) for one project
    pub async fn load_details(self, pool: &PgPool) -> Result<ProjectDetails, sqlx::Error> {
        let members = ProjectMember::list_by_project(pool, self.id).await?;
        let tasks = Task::list_by_project_with_assignees(pool, self.id).await?;

        Ok(ProjectDetails {
            project: self,
            members,
            tasks,
        })
    }

    /// Loads members and tasks for several projects with one query per table
    pub async fn load_details_many(
        pool: &PgPool,
        projects: Vec<Project>,
    ) -> Result<Vec<ProjectDetails>, sqlx::Error> {
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

        let mut members: HashMap<Uuid, Vec<MemberWithUser>> = HashMap::new();
        for member in ProjectMember::list_by_projects(pool, &ids).await? {
            members.entry(member.project_id).or_default().push(member);
        }

        let mut tasks: HashMap<Uuid, Vec<TaskWithAssignees>> = HashMap::new();
        for task in Task::list_by_projects_with_assignees(pool, &ids).await? {
            tasks.entry(task.task.project_id).or_default().push(task);
        }

        Ok(projects
            .into_iter()
            .map(|project| ProjectDetails {
                members: members.remove(&project.id).unwrap_or_default(),
                tasks: tasks.remove(&project.id).unwrap_or_default(),
                project,
            })
            .collect())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }
}
