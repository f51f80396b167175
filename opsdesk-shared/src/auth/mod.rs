/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`identity`]: Bearer credential → [`identity::Caller`]
/// - [`policy`]: Per-resource access rules and read scopes
///
/// # Example
///
/// ```
/// use opsdesk_shared::auth::identity::Caller;
/// use opsdesk_shared::auth::policy::{authorize, Operation, Resource};
/// use opsdesk_shared::models::role::Role;
/// use uuid::Uuid;
///
/// let member = Caller { user_id: Uuid::new_v4(), role: Role::NonLead };
///
/// assert!(authorize(Resource::Task, &member, Operation::Create, None).is_ok());
/// assert!(authorize(Resource::Budget, &member, Operation::Create, None).is_err());
/// ```

pub mod identity;
pub mod jwt;
pub mod password;
pub mod policy;
