/// Tasks
///
/// Any member can create a task. A non-lead sees and changes only the tasks
/// they created or are assigned to.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('backlog', 'in_progress', 'done', 'blocked');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'backlog',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date DATE,
///     assignee_user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use opsdesk_shared::auth::policy::ReadScope;
/// use opsdesk_shared::models::task::{CreateTask, Task, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, caller: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, caller, CreateTask {
///     title: Some("Fix bug".to_string()),
///     ..Default::default()
/// })
/// .await?;
/// assert_eq!(task.status, TaskStatus::Backlog);
///
/// let mine = Task::list(&pool, ReadScope::AssigneeOrCreator(caller)).await?;
/// assert!(mine.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{check_non_blank, double_option, push_scope, RECENCY_ORDER};
use crate::auth::policy::{Ownership, ReadScope};

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Backlog,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }

    /// Every status except `done` counts as pending work
    pub fn is_pending(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub assignee_user_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            created_by: self.created_by,
            assignee: self.assignee_user_id,
        }
    }
}

/// Request body for creating a task
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_create_task"))]
pub struct CreateTask {
    #[validate(
        required(message = "title is required"),
        length(max = 255, message = "title must be at most 255 characters")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    pub assignee_user_id: Option<Uuid>,
}

fn validate_create_task(input: &CreateTask) -> Result<(), ValidationError> {
    check_non_blank("title", input.title.as_deref())
}

/// Partial update for a task
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_task_patch"))]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_user_id: Option<Option<Uuid>>,
}

fn validate_task_patch(patch: &TaskPatch) -> Result<(), ValidationError> {
    if patch.title.is_some() {
        check_non_blank("title", patch.title.as_deref())?;
    }
    Ok(())
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, \
     assignee_user_id, created_by, created_at, updated_at";

impl Task {
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        scope: ReadScope,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_scope(&mut qb, scope);
        qb.push(RECENCY_ORDER);

        qb.build_query_as::<Task>().fetch_all(executor).await
    }

    /// Most recent tasks under `scope` created no later than `as_of`
    pub async fn recent<'e>(
        executor: impl PgExecutor<'e>,
        scope: ReadScope,
        as_of: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_scope(&mut qb, scope);
        qb.push(" AND created_at <= ").push_bind(as_of);
        qb.push(RECENCY_ORDER);
        qb.push(" LIMIT ").push_bind(limit);

        qb.build_query_as::<Task>().fetch_all(executor).await
    }

    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        created_by: Uuid,
        input: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks
                (title, description, status, priority, due_date, assignee_user_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(input.title.unwrap_or_default().trim().to_string())
        .bind(input.description)
        .bind(input.status.unwrap_or_default())
        .bind(input.priority.unwrap_or_default())
        .bind(input.due_date)
        .bind(input.assignee_user_id)
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    /// Loads a task and locks the row until the transaction ends
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        patch: TaskPatch,
    ) -> Result<Self, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = patch.title {
            qb.push(", title = ").push_bind(title.trim().to_string());
        }
        if let Some(description) = patch.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(priority) = patch.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = patch.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assignee_user_id) = patch.assignee_user_id {
            qb.push(", assignee_user_id = ").push_bind(assignee_user_id);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {TASK_COLUMNS}"));

        qb.build_query_as::<Task>().fetch_one(executor).await
    }

    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Backlog);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_task_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert!(serde_json::from_str::<TaskStatus>(r#""todo""#).is_err());
    }

    #[test]
    fn test_pending_excludes_only_done() {
        assert!(TaskStatus::Backlog.is_pending());
        assert!(TaskStatus::InProgress.is_pending());
        assert!(TaskStatus::Blocked.is_pending());
        assert!(!TaskStatus::Done.is_pending());
    }

    #[test]
    fn test_create_task_minimal_body() {
        let input: CreateTask = serde_json::from_str(r#"{"title": "Fix bug"}"#).unwrap();

        assert!(input.validate().is_ok());
        assert!(input.status.is_none());
        assert!(input.priority.is_none());
    }

    #[test]
    fn test_create_task_rejects_missing_or_blank_title() {
        let missing: CreateTask = serde_json::from_str(r#"{"priority": "high"}"#).unwrap();
        assert!(missing.validate().is_err());

        let blank: CreateTask = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_create_task_cannot_set_creator() {
        let body = format!(r#"{{"title": "x", "created_by": "{}"}}"#, Uuid::new_v4());
        assert!(serde_json::from_str::<CreateTask>(&body).is_err());
    }

    #[test]
    fn test_task_patch_clears_due_date_and_assignee() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"due_date": null, "assignee_user_id": null}"#).unwrap();

        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.assignee_user_id, Some(None));
        assert!(patch.status.is_none());
    }

    #[test]
    fn test_task_recent_query_shape() {
        let user_id = Uuid::new_v4();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM tasks");
        push_scope(&mut qb, ReadScope::AssigneeOrCreator(user_id));
        qb.push(" AND created_at <= ").push_bind(Utc::now());
        qb.push(RECENCY_ORDER);

        assert!(qb.sql().ends_with("ORDER BY created_at DESC, id ASC"));
        assert!(qb.sql().contains("created_at <= $3"));
    }
}
