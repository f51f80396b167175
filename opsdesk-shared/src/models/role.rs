/// Team roles
///
/// Every user has exactly one row in `user_roles`. A missing row reads as
/// [`Role::NonLead`], so code that looks a role up never fails on absence.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Role of a team member
///
/// Maps to the `app_role` Postgres enum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "app_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full read/write across every resource
    Lead,

    /// Scoped to own or assigned records
    #[default]
    NonLead,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Lead => "lead",
            Role::NonLead => "non_lead",
        }
    }

    pub fn is_lead(&self) -> bool {
        matches!(self, Role::Lead)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queries over `user_roles`
pub struct UserRole;

impl UserRole {
    /// Sets the role of `user_id`, inserting the row if it is missing
    pub async fn assign<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        role: Role,
    ) -> Result<Role, sqlx::Error> {
        sqlx::query_scalar::<_, Role>(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING role
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    /// Role of `user_id`, defaulting to non-lead when no row exists
    pub async fn find<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<Role, sqlx::Error> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

        Ok(role.unwrap_or_default())
    }

    /// Whether at least one lead exists
    pub async fn any_lead<'e>(executor: impl PgExecutor<'e>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_roles WHERE role = 'lead')")
            .fetch_one(executor)
            .await
    }
}
