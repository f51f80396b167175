/// Own-profile endpoints
///
/// Every member can read and rename themselves. The target is always the
/// caller; there is no id parameter to point elsewhere.
///
/// # Endpoints
///
/// - `GET /profile` - The caller as a team member
/// - `PATCH /profile` - Body `{"full_name": "..." | null}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::Data,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use opsdesk_shared::{
    auth::identity::Caller,
    models::user::{ProfilePatch, TeamMember},
};
use tracing::info;
use validator::Validate;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Data<TeamMember>>> {
    let member = TeamMember::find(&state.db, caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(Data::new(member)))
}

/// Update the caller's profile
///
/// Only `full_name` can change. Email, role, and status are rejected as
/// unknown fields.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult<Json<Data<TeamMember>>> {
    let Json(patch) = payload?;
    patch.validate()?;

    let member = TeamMember::update_profile(&state.db, caller.user_id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    info!(user_id = %caller.user_id, "Profile updated");
    Ok(Json(Data::new(member)))
}
