/// Identity middleware
///
/// Runs in front of every protected route. Resolves the `Authorization`
/// header into a [`Caller`] (user id plus current role) and stores it in the
/// request extensions, where handlers pick it up with `Extension<Caller>`.
/// Requests that cannot be resolved stop here with 401.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use opsdesk_shared::auth::identity::{self, Caller};

use crate::{app::AppState, error::ApiError};

pub async fn require_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| ApiError::Unauthorized("Malformed Authorization header".to_string()))?;

    let caller: Caller = identity::resolve(&state.db, state.jwt_secret(), header).await?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
