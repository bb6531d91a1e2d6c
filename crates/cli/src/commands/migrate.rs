//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! shopdesk migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPDESK_DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Admin migrations: `crates/admin/migrations/`

use shopdesk_admin::config::{AdminConfig, ConfigError};
use shopdesk_admin::db;

use super::CliError;

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn admin() -> Result<(), CliError> {
    let config = AdminConfig::from_env()?;
    let database_url = config
        .database_url
        .as_ref()
        .ok_or_else(|| ConfigError::MissingEnvVar("SHOPDESK_DATABASE_URL".to_string()))?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(database_url).await?;

    tracing::info!("Running admin migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
