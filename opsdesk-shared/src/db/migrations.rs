/// Embedded schema migrations
///
/// The SQL files under the workspace `migrations/` directory are compiled into
/// the binary with `sqlx::migrate!` and applied at startup. Each migration is a
/// `{version}_{name}.up.sql` / `{version}_{name}.down.sql` pair.
///
/// # Example
///
/// ```no_run
/// use opsdesk_shared::db::migrations::{run_migrations, schema_version};
/// use opsdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// run_migrations(&pool).await?;
/// println!("schema at {:?}", schema_version(&pool).await?);
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::Migrator, PgPool};
use tracing::{error, info};

/// Migrations embedded from `<workspace>/migrations`
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies every pending migration
///
/// Each migration runs in its own transaction; a failure rolls that migration
/// back and is returned.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(available = MIGRATOR.iter().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Latest successfully applied migration version, if any
pub async fn schema_version(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(None);
    }

    sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
}
