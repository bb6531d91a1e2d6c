//! CLI command implementations.

pub mod migrate;
pub mod seed;

use thiserror::Error;

use shopdesk_admin::config::ConfigError;
use shopdesk_admin::services::ServiceError;
use shopdesk_admin::state::StateError;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Startup error: {0}")]
    State(#[from] StateError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture file: {0}")]
    Fixture(#[from] serde_yaml::Error),

    #[error("Unknown {kind} '{key}'")]
    UnknownKey { kind: &'static str, key: String },

    #[error("Duplicate {kind} key '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("Seeding {what} failed: {source}")]
    Seed {
        what: String,
        #[source]
        source: ServiceError,
    },
}
