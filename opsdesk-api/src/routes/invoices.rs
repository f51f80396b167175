/// Invoice endpoints
///
/// Leads see and manage every invoice. Other members only list the invoices
/// assigned to them and cannot change any.
///
/// # Endpoints
///
/// - `GET /invoices` - List visible invoices, newest first
/// - `POST /invoices` - Create an invoice (lead)
/// - `PATCH /invoices?id=<uuid>` - Update an invoice (lead)
/// - `DELETE /invoices?id=<uuid>` - Delete an invoice (lead)

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
    models::invoice::{CreateInvoice, Invoice, InvoicePatch},
};
use tracing::info;
use validator::Validate;

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Data<Vec<Invoice>>>> {
    let scope = ReadScope::for_caller(Resource::Invoice, &caller);
    let invoices = Invoice::list(&state.db, scope).await?;

    Ok(Json(Data::new(invoices)))
}

/// Create an invoice
///
/// ```text
/// POST /invoices
///
/// {
///   "vendor_name": "Acme Supplies",
///   "invoice_number": "INV-0042",
///   "amount": 120.50,
///   "due_date": "2025-04-30",
///   "assigned_user_id": "uuid"
/// }
/// ```
///
/// An unknown `assigned_user_id` is rejected with 400.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateInvoice>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<Invoice>>)> {
    authorize(Resource::Invoice, &caller, Operation::Create, None)?;

    let Json(input) = payload?;
    input.validate()?;

    let invoice = Invoice::create(&state.db, caller.user_id, input).await?;

    info!(invoice_id = %invoice.id, user_id = %caller.user_id, "Invoice created");
    Ok((StatusCode::CREATED, Json(Data::new(invoice))))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<InvoicePatch>, JsonRejection>,
) -> ApiResult<Json<Data<Invoice>>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Invoice::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;

    authorize(
        Resource::Invoice,
        &caller,
        Operation::Update,
        Some(&existing.ownership()),
    )?;

    let Json(patch) = payload?;
    patch.validate()?;
    patch
        .check_dates_against(&existing)
        .map_err(|e| ApiError::invalid_field("due_date", e.to_string()))?;

    let invoice = Invoice::update(&mut *tx, id, patch).await?;
    tx.commit().await?;

    info!(invoice_id = %id, user_id = %caller.user_id, "Invoice updated");
    Ok(Json(Data::new(invoice)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Json<Deleted>> {
    let Query(query) = query?;
    let id = query.require()?;

    let mut tx = state.db.begin().await?;

    let existing = Invoice::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;

    authorize(
        Resource::Invoice,
        &caller,
        Operation::Delete,
        Some(&existing.ownership()),
    )?;

    Invoice::delete(&mut *tx, id).await?;
    tx.commit().await?;

    info!(invoice_id = %id, user_id = %caller.user_id, "Invoice deleted");
    Ok(Json(Deleted::ok()))
}
