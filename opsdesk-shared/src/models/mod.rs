/// Database models for OpsDesk
///
/// Each module holds a row type, its typed partial-update structure, and the
/// queries that touch its table.
///
/// - `role`: Lead / non-lead role per user (`user_roles`)
/// - `user`: Accounts and the team listing (`users`)
/// - `budget`: Budgets (`budgets`)
/// - `invoice`: Invoices (`invoices`)
/// - `task`: Tasks (`tasks`)
/// - `note`: Notes (`notes`)
///
/// Query functions take any `PgExecutor`, so they run against the pool or
/// inside a transaction (`&mut *tx`) alike. List queries take a
/// [`ReadScope`] and push it into the SQL `WHERE` clause.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use sqlx::{Postgres, QueryBuilder};
use validator::ValidationError;

use crate::auth::policy::ReadScope;

pub mod budget;
pub mod invoice;
pub mod note;
pub mod role;
pub mod task;
pub mod user;

/// Deserializes a field that distinguishes "absent" from "explicit null"
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`,
/// value → `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Fails if a present string is empty after trimming
pub(crate) fn check_non_blank(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(invalid("blank", format!("{field} must not be blank"))),
        _ => Ok(()),
    }
}

pub(crate) fn check_non_negative(field: &str, value: Option<Decimal>) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => {
            Err(invalid("range", format!("{field} must not be negative")))
        }
        _ => Ok(()),
    }
}

/// Fails if both dates are present and the end precedes the start
pub(crate) fn check_date_range(
    (start_field, start): (&str, Option<NaiveDate>),
    (end_field, end): (&str, Option<NaiveDate>),
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(invalid(
            "date_range",
            format!("{end_field} must not be before {start_field}"),
        )),
        _ => Ok(()),
    }
}

/// Pushes the row-level filter for `scope` as a `WHERE` clause
///
/// Always emits a `WHERE`, so callers can append further `AND` conditions.
pub(crate) fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: ReadScope) {
    match scope {
        ReadScope::All => {
            qb.push(" WHERE TRUE");
        }
        ReadScope::AssignedTo(user_id) => {
            qb.push(" WHERE assigned_user_id = ").push_bind(user_id);
        }
        ReadScope::AssigneeOrCreator(user_id) => {
            qb.push(" WHERE (assignee_user_id = ")
                .push_bind(user_id)
                .push(" OR created_by = ")
                .push_bind(user_id)
                .push(")");
        }
        ReadScope::CreatedBy(user_id) => {
            qb.push(" WHERE created_by = ").push_bind(user_id);
        }
    }
}

/// Newest first; ties fall back to id so ordering is deterministic
pub(crate) const RECENCY_ORDER: &str = " ORDER BY created_at DESC, id ASC";
