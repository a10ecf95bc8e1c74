/// Task assignment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_assignees (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assigned_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```
///
/// Assigning is idempotent (`ON CONFLICT DO NOTHING`) and so is unassigning:
/// removing a pair that does not exist succeeds and changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskAssignee {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// An assignment with the assigned user's public fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeWithUser {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(sqlx::FromRow)]
struct AssigneeRow {
    task_id: Uuid,
    user_id: Uuid,
    assigned_at: DateTime<Utc>,
    name: String,
    email: String,
}

impl From<AssigneeRow> for AssigneeWithUser {
    fn from(row: AssigneeRow) -> Self {
        Self {
            task_id: row.task_id,
            user_id: row.user_id,
            assigned_at: row.assigned_at,
            user: UserSummary {
                id: row.user_id,
                name: row.name,
                email: row.email,
            },
        }
    }
}

impl TaskAssignee {
    /// Assigns one user; returns false if the pair already existed
    pub async fn assign(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO task_assignees (task_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (task_id, user_id) DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Assigns several users in one transaction
    ///
    /// Returns how many new pairs were created. Duplicates in `user_ids` and
    /// existing assignments are skipped.
    pub async fn assign_many(
        pool: &PgPool,
        task_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if let [user_id] = user_ids {
            return Ok(u64::from(Self::assign(pool, task_id, *user_id).await?));
        }

        let mut tx = pool.begin().await?;
        let mut created = 0;

        for user_id in user_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO task_assignees (task_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (task_id, user_id) DO NOTHING
                "#,
            )
            .bind(task_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            created += result.rows_affected();
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Removes an assignment; returns false if there was none
    pub async fn unassign(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_assigned(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM task_assignees WHERE task_id = $1 AND user_id = $2)",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Assignees of the given tasks with user details, in assignment order
    pub async fn list_by_tasks(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<Vec<AssigneeWithUser>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT ta.task_id, ta.user_id, ta.assigned_at, u.name, u.email
            FROM task_assignees ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = ANY($1) AND u.deleted_at IS NULL
            ORDER BY ta.assigned_at ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(AssigneeWithUser::from).collect())
    }
}
