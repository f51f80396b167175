/// Dashboard endpoint
///
/// `GET /dashboard` returns the caller's summary:
///
/// ```json
/// {
///   "data": {
///     "stats": {
///       "totalBudgets": 3, "activeBudgets": 1,
///       "totalInvoices": 2, "unpaidInvoices": 2,
///       "totalTasks": 5, "pendingTasks": 3,
///       "totalNotes": 4, "teamMembers": 6
///     },
///     "recentItems": [ ... up to 5 tasks ... ],
///     "asOf": "2025-03-01T12:00:00Z"
///   }
/// }
/// ```
///
/// Counters follow the same visibility rules as the list endpoints.

use crate::{app::AppState, error::ApiResult, routes::Data};
use axum::{extract::State, Extension, Json};
use opsdesk_shared::{
    auth::identity::Caller,
    dashboard::{self, Dashboard},
};

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Data<Dashboard>>> {
    let dashboard = dashboard::get_dashboard(&state.db, &caller).await?;
    Ok(Json(Data::new(dashboard)))
}
