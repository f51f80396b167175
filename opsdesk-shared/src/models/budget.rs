/// Budgets
///
/// Budgets are readable by every member and writable by leads only.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE budgets (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     period_type budget_period NOT NULL DEFAULT 'month',
///     start_date DATE,
///     end_date DATE,
///     total_budget_amount NUMERIC(14, 2) NOT NULL DEFAULT 0,
///     currency VARCHAR(3) NOT NULL DEFAULT 'USD',
///     status budget_status NOT NULL DEFAULT 'draft',
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{check_date_range, check_non_blank, check_non_negative, double_option, push_scope, RECENCY_ORDER};
use crate::auth::policy::{Ownership, ReadScope};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "budget_period", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    #[default]
    Month,
    Quarter,
    Year,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "budget_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    Draft,
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    pub period_type: BudgetPeriod,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget_amount: Decimal,
    pub currency: String,
    pub status: BudgetStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            created_by: self.created_by,
            assignee: None,
        }
    }
}

pub const DEFAULT_CURRENCY: &str = "USD";

/// Three-letter ISO 4217 style code, upper case
fn check_currency(currency: Option<&str>) -> Result<(), ValidationError> {
    match currency {
        Some(code) if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) => {
            let mut error = ValidationError::new("currency");
            error.message = Some("currency must be a three-letter upper-case code".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Request body for creating a budget
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_create_budget"))]
pub struct CreateBudget {
    #[validate(
        required(message = "name is required"),
        length(max = 255, message = "name must be at most 255 characters")
    )]
    pub name: Option<String>,
    pub period_type: Option<BudgetPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<BudgetStatus>,
}

fn validate_create_budget(input: &CreateBudget) -> Result<(), ValidationError> {
    check_non_blank("name", input.name.as_deref())?;
    check_non_negative("total_budget_amount", input.total_budget_amount)?;
    check_currency(input.currency.as_deref())?;
    check_date_range(("start_date", input.start_date), ("end_date", input.end_date))
}

/// Partial update for a budget
///
/// Absent fields are left alone. `start_date` and `end_date` can be cleared
/// with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_budget_patch"))]
pub struct BudgetPatch {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    pub period_type: Option<BudgetPeriod>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub total_budget_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<BudgetStatus>,
}

fn validate_budget_patch(patch: &BudgetPatch) -> Result<(), ValidationError> {
    if patch.name.is_some() {
        check_non_blank("name", patch.name.as_deref())?;
    }
    check_non_negative("total_budget_amount", patch.total_budget_amount)?;
    check_currency(patch.currency.as_deref())?;
    check_date_range(
        ("start_date", patch.start_date.flatten()),
        ("end_date", patch.end_date.flatten()),
    )
}

impl BudgetPatch {
    /// Checks the date range the stored budget will have once this patch lands
    ///
    /// A patch that moves only one end of the range is compared against the
    /// stored value of the other end.
    pub fn check_dates_against(&self, existing: &Budget) -> Result<(), ValidationError> {
        check_date_range(
            ("start_date", self.start_date.unwrap_or(existing.start_date)),
            ("end_date", self.end_date.unwrap_or(existing.end_date)),
        )
    }
}

const BUDGET_COLUMNS: &str = "id, name, period_type, start_date, end_date, total_budget_amount, \
     currency, status, created_by, created_at, updated_at";

impl Budget {
    /// Budgets visible under `scope`, newest first
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        scope: ReadScope,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {BUDGET_COLUMNS} FROM budgets"));
        push_scope(&mut qb, scope);
        qb.push(RECENCY_ORDER);

        qb.build_query_as::<Budget>().fetch_all(executor).await
    }

    /// Inserts a validated budget, filling unset fields with defaults
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        created_by: Uuid,
        input: CreateBudget,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Budget>(&format!(
            r#"
            INSERT INTO budgets
                (name, period_type, start_date, end_date, total_budget_amount,
                 currency, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BUDGET_COLUMNS}
            "#
        ))
        .bind(input.name.unwrap_or_default().trim().to_string())
        .bind(input.period_type.unwrap_or_default())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.total_budget_amount.unwrap_or(Decimal::ZERO))
        .bind(input.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
        .bind(input.status.unwrap_or_default())
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    /// Loads a budget and locks the row until the transaction ends
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Budget>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Applies `patch` and bumps `updated_at`
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        patch: BudgetPatch,
    ) -> Result<Self, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE budgets SET updated_at = NOW()");

        if let Some(name) = patch.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(period_type) = patch.period_type {
            qb.push(", period_type = ").push_bind(period_type);
        }
        if let Some(start_date) = patch.start_date {
            qb.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = patch.end_date {
            qb.push(", end_date = ").push_bind(end_date);
        }
        if let Some(amount) = patch.total_budget_amount {
            qb.push(", total_budget_amount = ").push_bind(amount);
        }
        if let Some(currency) = patch.currency {
            qb.push(", currency = ").push_bind(currency);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {BUDGET_COLUMNS}"));

        qb.build_query_as::<Budget>().fetch_one(executor).await
    }

    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
