/// Caller identity resolution
///
/// Turns an `Authorization` header into a [`Caller`]: the user id from a
/// valid access token plus the role currently stored for that user. The role
/// is read on every request and never cached, so demoting a lead takes effect
/// immediately.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::{role::Role, user::UserStatus};

/// The authenticated principal of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn is_lead(&self) -> bool {
        self.role.is_lead()
    }
}

/// Why a request could not be authenticated
///
/// Every variant except `Database` means the caller is unauthenticated.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing Authorization header")]
    MissingCredentials,

    #[error("Authorization header must use the Bearer scheme")]
    InvalidScheme,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("User no longer exists")]
    UnknownUser,

    #[error("User account is inactive")]
    InactiveUser,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Extracts the token from a `Bearer <token>` header value
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Result<&str, IdentityError> {
    let header = header.ok_or(IdentityError::MissingCredentials)?.trim();

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(IdentityError::InvalidScheme)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(IdentityError::InvalidScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(IdentityError::MissingCredentials);
    }

    Ok(token)
}

/// Resolves the caller behind an `Authorization` header value
///
/// One query loads the user's status and role together. A missing role row
/// yields [`Role::NonLead`].
pub async fn resolve(
    pool: &PgPool,
    secret: &str,
    authorization: Option<&str>,
) -> Result<Caller, IdentityError> {
    let token = bearer_token(authorization)?;
    let claims = validate_access_token(token, secret)?;

    let row: Option<(UserStatus, Option<Role>)> = sqlx::query_as(
        r#"
        SELECT u.status, r.role
        FROM users u
        LEFT JOIN user_roles r ON r.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(claims.sub)
    .fetch_optional(pool)
    .await?;

    let (status, role) = row.ok_or(IdentityError::UnknownUser)?;

    if !status.is_active() {
        return Err(IdentityError::InactiveUser);
    }

    let caller = Caller {
        user_id: claims.sub,
        role: role.unwrap_or_default(),
    };

    debug!(user_id = %caller.user_id, role = %caller.role, "Resolved caller");
    Ok(caller)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("  Bearer   abc  ")).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert!(matches!(bearer_token(None), Err(IdentityError::MissingCredentials)));
        assert!(matches!(
            bearer_token(Some("Bearer ")),
            Err(IdentityError::InvalidScheme) | Err(IdentityError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(IdentityError::InvalidScheme)
        ));
        assert!(matches!(bearer_token(Some("abc")), Err(IdentityError::InvalidScheme)));
    }

    #[test]
    fn test_caller_is_lead() {
        let id = Uuid::new_v4();
        assert!(Caller { user_id: id, role: Role::Lead }.is_lead());
        assert!(!Caller { user_id: id, role: Role::NonLead }.is_lead());
    }
}
