/// Invoices
///
/// Leads see and manage every invoice. Other members only see the invoices
/// assigned to them, and cannot change them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invoices (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     vendor_name VARCHAR(255) NOT NULL,
///     client_name VARCHAR(255),
///     invoice_number VARCHAR(100),
///     amount NUMERIC(14, 2),
///     status invoice_status NOT NULL DEFAULT 'unpaid',
///     issue_date DATE,
///     due_date DATE,
///     notes TEXT,
///     assigned_user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     linked_budget_id UUID REFERENCES budgets(id) ON DELETE SET NULL,
///     linked_category_id UUID,
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
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub vendor_name: String,
    pub client_name: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: Option<Decimal>,
    pub status: InvoiceStatus,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub assigned_user_id: Option<Uuid>,
    pub linked_budget_id: Option<Uuid>,
    pub linked_category_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            created_by: self.created_by,
            assignee: self.assigned_user_id,
        }
    }
}

/// Request body for creating an invoice
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_create_invoice"))]
pub struct CreateInvoice {
    #[validate(
        required(message = "vendor_name is required"),
        length(max = 255, message = "vendor_name must be at most 255 characters")
    )]
    pub vendor_name: Option<String>,
    #[validate(length(max = 255, message = "client_name must be at most 255 characters"))]
    pub client_name: Option<String>,
    #[validate(length(max = 100, message = "invoice_number must be at most 100 characters"))]
    pub invoice_number: Option<String>,
    pub amount: Option<Decimal>,
    pub status: Option<InvoiceStatus>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub assigned_user_id: Option<Uuid>,
    pub linked_budget_id: Option<Uuid>,
    pub linked_category_id: Option<Uuid>,
}

fn validate_create_invoice(input: &CreateInvoice) -> Result<(), ValidationError> {
    check_non_blank("vendor_name", input.vendor_name.as_deref())?;
    check_non_negative("amount", input.amount)?;
    check_date_range(("issue_date", input.issue_date), ("due_date", input.due_date))
}

/// Partial update for an invoice
///
/// Every field except `vendor_name` and `status` can be cleared with `null`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_invoice_patch"))]
pub struct InvoicePatch {
    #[validate(length(min = 1, max = 255, message = "vendor_name must be 1-255 characters"))]
    pub vendor_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub client_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub invoice_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub amount: Option<Option<Decimal>>,
    pub status: Option<InvoiceStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub issue_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_user_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub linked_budget_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub linked_category_id: Option<Option<Uuid>>,
}

fn validate_invoice_patch(patch: &InvoicePatch) -> Result<(), ValidationError> {
    if patch.vendor_name.is_some() {
        check_non_blank("vendor_name", patch.vendor_name.as_deref())?;
    }
    check_non_negative("amount", patch.amount.flatten())?;
    check_date_range(
        ("issue_date", patch.issue_date.flatten()),
        ("due_date", patch.due_date.flatten()),
    )
}

impl InvoicePatch {
    /// Checks `issue_date`/`due_date` as they will be stored after this patch
    pub fn check_dates_against(&self, existing: &Invoice) -> Result<(), ValidationError> {
        check_date_range(
            ("issue_date", self.issue_date.unwrap_or(existing.issue_date)),
            ("due_date", self.due_date.unwrap_or(existing.due_date)),
        )
    }
}

const INVOICE_COLUMNS: &str = "id, vendor_name, client_name, invoice_number, amount, status, \
     issue_date, due_date, notes, assigned_user_id, linked_budget_id, linked_category_id, \
     created_by, created_at, updated_at";

impl Invoice {
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        scope: ReadScope,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {INVOICE_COLUMNS} FROM invoices"));
        push_scope(&mut qb, scope);
        qb.push(RECENCY_ORDER);

        qb.build_query_as::<Invoice>().fetch_all(executor).await
    }

    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        created_by: Uuid,
        input: CreateInvoice,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices
                (vendor_name, client_name, invoice_number, amount, status, issue_date,
                 due_date, notes, assigned_user_id, linked_budget_id, linked_category_id,
                 created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(input.vendor_name.unwrap_or_default().trim().to_string())
        .bind(input.client_name)
        .bind(input.invoice_number)
        .bind(input.amount)
        .bind(input.status.unwrap_or_default())
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(input.notes)
        .bind(input.assigned_user_id)
        .bind(input.linked_budget_id)
        .bind(input.linked_category_id)
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    /// Loads an invoice and locks the row until the transaction ends
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        patch: InvoicePatch,
    ) -> Result<Self, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE invoices SET updated_at = NOW()");

        if let Some(vendor_name) = patch.vendor_name {
            qb.push(", vendor_name = ").push_bind(vendor_name.trim().to_string());
        }
        if let Some(client_name) = patch.client_name {
            qb.push(", client_name = ").push_bind(client_name);
        }
        if let Some(invoice_number) = patch.invoice_number {
            qb.push(", invoice_number = ").push_bind(invoice_number);
        }
        if let Some(amount) = patch.amount {
            qb.push(", amount = ").push_bind(amount);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(issue_date) = patch.issue_date {
            qb.push(", issue_date = ").push_bind(issue_date);
        }
        if let Some(due_date) = patch.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(notes) = patch.notes {
            qb.push(", notes = ").push_bind(notes);
        }
        if let Some(assigned_user_id) = patch.assigned_user_id {
            qb.push(", assigned_user_id = ").push_bind(assigned_user_id);
        }
        if let Some(linked_budget_id) = patch.linked_budget_id {
            qb.push(", linked_budget_id = ").push_bind(linked_budget_id);
        }
        if let Some(linked_category_id) = patch.linked_category_id {
            qb.push(", linked_category_id = ").push_bind(linked_category_id);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {INVOICE_COLUMNS}"));

        qb.build_query_as::<Invoice>().fetch_one(executor).await
    }

    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
