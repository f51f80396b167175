/// Task endpoints
///
/// Any member can create tasks. A non-lead sees the tasks assigned to or
/// created by them, and may update or delete exactly those.
///
/// # Endpoints
///
/// - `GET /tasks` - List visible tasks, newest first
/// - `POST /tasks` - Create a task
/// - `PATCH /tasks?id=<uuid>` - Update a task (lead, assignee, or creator)
/// - `DELETE /tasks?id=<uuid>` - Delete a task (lead, assignee, or creator)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Data, Deleted, IdQuery},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use opsdesk_shared::{
    auth::{
        identity::Caller,
        policy::{authorize, Operation, ReadScope, Resource},
    },
    models::task::{CreateTask, Task, TaskPatch},
};
use tracing::info;
use validator::Validate;

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Data<Vec<Task>>>> {
    let scope = ReadScope::for_caller(Resource::Task, &caller);
    let tasks = Task::list(&state.db, scope).await?;

    Ok(Json(Data::new(tasks)))
}

/// Create a task
///
/// ```text
/// POST /tasks
///
/// {
///   "title": "Renew insurance",
///   "priority": "high",
///   "due_date": "2025-05-15",
///   "assignee_user_id": "uuid"
/// }
/// ```
///
/// The caller becomes `created_by`. Status defaults to `backlog` and
/// priority to `medium`.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<Task>>)> {
    authorize(Resource::Task, &caller, Operation::Create, None)?;

    let Json(input) = payload?;
    input.validate()?;

    let task = Task::create(&state.db, caller.user_id, input).await?;

    info!(task_id = %task.id, user_id = %caller.user_id, "Task created");
    Ok((StatusCode::CREATED, Json(Data::new(task))))
}

/// Update a task
///
/// The ownership check runs against the stored row, read under
/// `FOR UPDATE`, so a concurrent reassignment cannot slip between the check
/// and the write.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<Data<Task>>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Task::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorize(
        Resource::Task,
        &caller,
        Operation::Update,
        Some(&existing.ownership()),
    )?;

    let Json(patch) = payload?;
    patch.validate()?;

    let task = Task::update(&mut *tx, id, patch).await?;
    tx.commit().await?;

    info!(task_id = %id, user_id = %caller.user_id, status = task.status.as_str(), "Task updated");
    Ok(Json(Data::new(task)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Json<Deleted>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Task::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorize(
        Resource::Task,
        &caller,
        Operation::Delete,
        Some(&existing.ownership()),
    )?;

    Task::delete(&mut *tx, id).await?;
    tx.commit().await?;

    info!(task_id = %id, user_id = %caller.user_id, "Task deleted");
    Ok(Json(Deleted::ok()))
}
