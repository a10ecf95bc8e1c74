/// Database models for Tasklane
///
/// # Models
///
/// - `user`: User accounts
/// - `project`: Projects, their owner and eager-loaded details
/// - `project_member`: User-project relationships with OWNER/MEMBER roles
/// - `task`: Tasks scoped to a project
/// - `task_assignee`: User-task assignments
///
/// All entities except the two join tables are soft-deleted through a
/// `deleted_at` column and every finder skips deleted rows.

pub mod project;
pub mod project_member;
pub mod task;
pub mod task_assignee;
pub mod user;
