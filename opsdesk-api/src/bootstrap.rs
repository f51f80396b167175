/// First-lead seeding
///
/// A fresh database has no lead, and only leads can add members, so the
/// server seeds one at startup from `BOOTSTRAP_LEAD_EMAIL` and
/// `BOOTSTRAP_LEAD_PASSWORD`. Once any lead exists this is a no-op.

use opsdesk_shared::{
    auth::password,
    models::{
        role::{Role, UserRole},
        user::{CreateUser, TeamMember, User},
    },
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::BootstrapLead;

/// What [`ensure_lead`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A lead already existed
    AlreadyPresent,

    /// The account existed and was promoted
    Promoted,

    /// A new lead account was created
    Created,

    /// No lead exists and no bootstrap credentials were configured
    Skipped,
}

/// Makes sure at least one lead exists
pub async fn ensure_lead(
    pool: &PgPool,
    lead: Option<&BootstrapLead>,
) -> anyhow::Result<BootstrapOutcome> {
    if UserRole::any_lead(pool).await? {
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    let Some(lead) = lead else {
        warn!("No lead exists and BOOTSTRAP_LEAD_EMAIL is not set; nobody can manage the team");
        return Ok(BootstrapOutcome::Skipped);
    };

    if let Some(user) = User::find_by_email(pool, &lead.email).await? {
        UserRole::assign(pool, user.id, Role::Lead).await?;
        info!(user_id = %user.id, "Promoted existing account to lead");
        return Ok(BootstrapOutcome::Promoted);
    }

    password::validate_password_length(&lead.password)
        .map_err(|msg| anyhow::anyhow!("BOOTSTRAP_LEAD_PASSWORD: {}", msg))?;

    let plain = lead.password.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;

    let member = TeamMember::create(
        pool,
        CreateUser {
            email: lead.email.clone(),
            password_hash,
            full_name: None,
        },
        Role::Lead,
    )
    .await?;

    info!(user_id = %member.id, "Created bootstrap lead");
    Ok(BootstrapOutcome::Created)
}
