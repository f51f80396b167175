/// Budget endpoints
///
/// Every member can list budgets; only leads can create, update, or delete.
///
/// # Endpoints
///
/// - `GET /budgets` - List budgets, newest first
/// - `POST /budgets` - Create a budget (lead)
/// - `PATCH /budgets?id=<uuid>` - Update a budget (lead)
/// - `DELETE /budgets?id=<uuid>` - Delete a budget (lead)

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
    models::budget::{Budget, BudgetPatch, CreateBudget},
};
use tracing::info;
use validator::Validate;

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Data<Vec<Budget>>>> {
    let scope = ReadScope::for_caller(Resource::Budget, &caller);
    let budgets = Budget::list(&state.db, scope).await?;

    Ok(Json(Data::new(budgets)))
}

/// Create a budget
///
/// # Endpoint
///
/// ```text
/// POST /budgets
/// Authorization: Bearer <token>
///
/// {
///   "name": "Q3 Marketing",
///   "period_type": "quarter",
///   "start_date": "2025-07-01",
///   "end_date": "2025-09-30",
///   "total_budget_amount": 12000.00,
///   "currency": "EUR"
/// }
/// ```
///
/// Omitted fields take their defaults: `month`, amount 0, `USD`, `draft`.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a lead (checked before the body)
/// - `400 Bad Request`: Malformed body or validation failure
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateBudget>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<Budget>>)> {
    authorize(Resource::Budget, &caller, Operation::Create, None)?;

    let Json(input) = payload?;
    input.validate()?;

    let budget = Budget::create(&state.db, caller.user_id, input).await?;

    info!(budget_id = %budget.id, user_id = %caller.user_id, "Budget created");
    Ok((StatusCode::CREATED, Json(Data::new(budget))))
}

/// Update a budget
///
/// Only the fields present in the body change; `null` clears a nullable
/// field. The row is locked for the duration of the check and the write.
///
/// # Errors
///
/// - `400 Bad Request`: Missing `id`, malformed body, or validation failure
/// - `404 Not Found`: No budget with that id
/// - `403 Forbidden`: Caller is not a lead
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<BudgetPatch>, JsonRejection>,
) -> ApiResult<Json<Data<Budget>>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Budget::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Budget not found".to_string()))?;

    authorize(
        Resource::Budget,
        &caller,
        Operation::Update,
        Some(&existing.ownership()),
    )?;

    let Json(patch) = payload?;
    patch.validate()?;
    patch
        .check_dates_against(&existing)
        .map_err(|e| ApiError::invalid_field("end_date", e.to_string()))?;

    let budget = Budget::update(&mut *tx, id, patch).await?;
    tx.commit().await?;

    info!(budget_id = %id, user_id = %caller.user_id, "Budget updated");
    Ok(Json(Data::new(budget)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Json<Deleted>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Budget::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Budget not found".to_string()))?;

    authorize(
        Resource::Budget,
        &caller,
        Operation::Delete,
        Some(&existing.ownership()),
    )?;

    Budget::delete(&mut *tx, id).await?;
    tx.commit().await?;

    info!(budget_id = %id, user_id = %caller.user_id, "Budget deleted");
    Ok(Json(Deleted::ok()))
}
