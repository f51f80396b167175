/// User accounts and the team view
///
/// [`User`] is the raw `users` row (including the password hash, which is
/// never serialized). [`TeamMember`] is what the team endpoints return: the
/// user joined with their role, with a missing role read as non-lead.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,          -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     full_name VARCHAR(255),
///     status user_status NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use opsdesk_shared::models::role::Role;
/// use opsdesk_shared::models::user::{CreateUser, TeamMember};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let member = TeamMember::create(
///     &pool,
///     CreateUser {
///         email: "sam@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         full_name: Some("Sam".to_string()),
///     },
///     Role::NonLead,
/// )
/// .await?;
///
/// assert_eq!(member.role, Role::NonLead);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use super::role::{Role, UserRole};

/// Account lifecycle status
///
/// Inactive users keep their data but can no longer authenticate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Stored as given; uniqueness and lookups compare `LOWER(email)`
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id hash, never the plaintext password
    pub password_hash: String,

    pub full_name: Option<String>,
}

/// Changes a member may make to their own profile
///
/// Email, role, and status are not part of it; unknown fields are rejected.
/// `full_name: null` or a blank name clears the name.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255, message = "full_name must be at most 255 characters"))]
    pub full_name: Option<Option<String>>,
}

impl ProfilePatch {
    /// The name to store, if the patch touches it
    fn normalized_full_name(&self) -> Option<Option<String>> {
        self.full_name.as_ref().map(|name| {
            name.as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, status, created_at, updated_at, last_login_at";

impl User {
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Case-insensitive lookup by email
    pub async fn find_by_email<'e>(
        executor: impl PgExecutor<'e>,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(executor)
        .await
    }

    /// Records a successful login
    pub async fn update_last_login<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user; their role row goes with them
    ///
    /// Records that reference the user keep existing with the reference
    /// cleared. Returns false if no such user existed.
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A user as seen by the team endpoints
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub status: UserStatus,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

const TEAM_SELECT: &str = r#"
    SELECT u.id, u.email, u.full_name, u.status,
           COALESCE(r.role, 'non_lead'::app_role) AS role,
           u.created_at, u.last_login_at
    FROM users u
    LEFT JOIN user_roles r ON r.user_id = u.id
"#;

impl TeamMember {
    /// Every user with their role, newest first
    pub async fn list<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(&format!(
            "{TEAM_SELECT} ORDER BY u.created_at DESC, u.id ASC"
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn find<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(&format!("{TEAM_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Creates the user and their role row in one transaction
    ///
    /// # Errors
    ///
    /// A duplicate email surfaces as a unique violation on `idx_users_email`.
    pub async fn create(pool: &PgPool, data: CreateUser, role: Role) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, full_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.email.trim())
        .bind(data.password_hash)
        .bind(data.full_name)
        .fetch_one(&mut *tx)
        .await?;

        let role = UserRole::assign(&mut *tx, user.id, role).await?;

        tx.commit().await?;

        Ok(TeamMember {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            status: user.status,
            role,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        })
    }

    /// Sets the lifecycle status; returns None if the user does not exist
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: UserStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find(pool, id).await
    }

    /// Applies a self-service profile patch; returns None if the user is gone
    ///
    /// An empty patch only bumps `updated_at`.
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = match patch.normalized_full_name() {
            Some(full_name) => {
                sqlx::query("UPDATE users SET full_name = $2, updated_at = NOW() WHERE id = $1")
                    .bind(id)
                    .bind(full_name)
                    .execute(pool)
                    .await?
            }
            None => {
                sqlx::query("UPDATE users SET updated_at = NOW() WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await?
            }
        };

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find(pool, id).await
    }

    /// Sets the role; returns None if the user does not exist
    pub async fn set_role(pool: &PgPool, id: Uuid, role: Role) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if !exists {
            return Ok(None);
        }

        UserRole::assign(&mut *tx, id, role).await?;
        let member = Self::find(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(member)
    }
}
