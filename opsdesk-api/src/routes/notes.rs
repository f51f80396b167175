/// Note endpoints
///
/// Notes are private to their creator; leads see and manage all of them.
///
/// - `GET /notes`
/// - `POST /notes`
/// - `PATCH /notes?id=<uuid>`
/// - `DELETE /notes?id=<uuid>`

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
    models::note::{CreateNote, Note, NotePatch},
};
use tracing::info;
use validator::Validate;

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Data<Vec<Note>>>> {
    let scope = ReadScope::for_caller(Resource::Note, &caller);
    let notes = Note::list(&state.db, scope).await?;

    Ok(Json(Data::new(notes)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateNote>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<Note>>)> {
    authorize(Resource::Note, &caller, Operation::Create, None)?;

    let Json(input) = payload?;
    input.validate()?;

    let note = Note::create(&state.db, caller.user_id, input).await?;

    info!(note_id = %note.id, user_id = %caller.user_id, "Note created");
    Ok((StatusCode::CREATED, Json(Data::new(note))))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<NotePatch>, JsonRejection>,
) -> ApiResult<Json<Data<Note>>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Note::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    authorize(
        Resource::Note,
        &caller,
        Operation::Update,
        Some(&existing.ownership()),
    )?;

    let Json(patch) = payload?;
    patch.validate()?;

    let note = Note::update(&mut *tx, id, patch).await?;
    tx.commit().await?;

    info!(note_id = %id, user_id = %caller.user_id, "Note updated");
    Ok(Json(Data::new(note)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Json<Deleted>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Note::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    authorize(
        Resource::Note,
        &caller,
        Operation::Delete,
        Some(&existing.ownership()),
    )?;

    Note::delete(&mut *tx, id).await?;
    tx.commit().await?;

    info!(note_id = %id, user_id = %caller.user_id, "Note deleted");
    Ok(Json(Deleted::ok()))
}
