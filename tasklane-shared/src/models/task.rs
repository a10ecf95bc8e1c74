/// Task model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'doing', 'done', 'blocked');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     creator_id UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// Every query joins the owning project and requires it to be live, so the
/// tasks of a soft-deleted project cannot be read, listed or modified.
///
/// Status changes are free-form: any status may follow any other.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::task_assignee::{AssigneeWithUser, TaskAssignee};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
    Blocked,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::Doing => "DOING",
            TaskStatus::Done => "DONE",
            TaskStatus::Blocked => "BLOCKED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub project_id: Uuid,

    pub creator_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,

    pub creator_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// Defaults to TODO
    pub status: Option<TaskStatus>,

    /// Defaults to MEDIUM
    pub priority: Option<TaskPriority>,

    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        *self == UpdateTask::default()
    }

    /// True when `status` is the only field being changed
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

/// A task with its assignees eagerly loaded
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithAssignees {
    #[serde(flatten)]
    pub task: Task,

    pub assignees: Vec<AssigneeWithUser>,
}

const TASK_COLUMNS: &str = "t.id, t.project_id, t.creator_id, t.title, t.description, t.status, \
     t.priority, t.due_date, t.created_at, t.updated_at, t.deleted_at";

const LIVE_TASKS: &str = "FROM tasks t \
     JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL \
     WHERE t.deleted_at IS NULL";

impl Task {
    /// Inserts a task; the caller must have checked project membership
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, creator_id, title, description, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, project_id, creator_id, title, description, status, priority,
                      due_date, created_at, updated_at, deleted_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.creator_id)
        .bind(data.title.trim())
        .bind(data.description)
        .bind(data.status.unwrap_or_default())
        .bind(data.priority.unwrap_or_default())
        .bind(data.due_date)
        .fetch_one(pool)
        .await
    }

    /// Finds a live task whose project is also live
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} {} AND t.id = $1", TASK_COLUMNS, LIVE_TASKS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live tasks of a project, oldest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} {} AND t.project_id = $1 ORDER BY t.created_at ASC",
            TASK_COLUMNS, LIVE_TASKS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Live tasks of a project with their assignees
    pub async fn list_by_project_with_assignees(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<TaskWithAssignees>, sqlx::Error> {
        let tasks = Self::list_by_project(pool, project_id).await?;
        Self::attach_assignees(pool, tasks).await
    }

    /// Live tasks of several projects with their assignees
    pub async fn list_by_projects_with_assignees(
        pool: &PgPool,
        project_ids: &[Uuid],
    ) -> Result<Vec<TaskWithAssignees>, sqlx::Error> {
        let query = format!(
            "SELECT {} {} AND t.project_id = ANY($1) ORDER BY t.created_at ASC",
            TASK_COLUMNS, LIVE_TASKS
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(project_ids)
            .fetch_all(pool)
            .await?;

        Self::attach_assignees(pool, tasks).await
    }

    /// Live tasks the user is assigned to, across all live projects
    pub async fn list_assigned_to_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} {} AND EXISTS (\
                SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $1\
             ) ORDER BY t.created_at ASC",
            TASK_COLUMNS, LIVE_TASKS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update to a live task
    ///
    /// Returns `None` when the task or its project is gone.
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks t SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(&format!(
            " FROM projects p WHERE t.id = $1 AND t.deleted_at IS NULL \
              AND p.id = t.project_id AND p.deleted_at IS NULL RETURNING {}",
            TASK_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title.trim().to_string());
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        q.fetch_optional(pool).await
    }

    /// Marks the task deleted; false if it was already gone
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the assignees of this task
    pub async fn with_assignees(self, pool: &PgPool) -> Result<TaskWithAssignees, sqlx::Error> {
        let assignees = TaskAssignee::list_by_tasks(pool, &[self.id]).await?;
        Ok(TaskWithAssignees {
            task: self,
            assignees,
        })
    }

    /// Loads assignees for many tasks with a single query
    pub async fn attach_assignees(
        pool: &PgPool,
        tasks: Vec<Task>,
    ) -> Result<Vec<TaskWithAssignees>, sqlx::Error> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        let mut by_task: HashMap<Uuid, Vec<AssigneeWithUser>> = HashMap::new();
        for assignee in TaskAssignee::list_by_tasks(pool, &ids).await? {
            by_task.entry(assignee.task_id).or_default().push(assignee);
        }

        Ok(tasks
            .into_iter()
            .map(|task| TaskWithAssignees {
                assignees: by_task.remove(&task.id).unwrap_or_default(),
                task,
            })
            .collect())
    }
}
