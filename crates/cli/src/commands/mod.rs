//! CLI command implementations.
//!
//! Every command works directly on the `PostgreSQL` key-value store through
//! the server library; the HTTP server does not need to be running.

pub mod admin;
pub mod fabrics;
pub mod migrate;

use cushion_core::EmailError;
use cushion_server::{
    config::{ConfigError, database_url_from_env},
    db::{AdminRoleError, RepositoryError},
    kv::{PgKvStore, create_pool},
    services::SyncError,
    storage::StorageError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// No database URL is configured.
    #[error("Missing environment variable: CATALOG_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Server configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    AdminRole(#[from] AdminRoleError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Connect to the key-value store named by the environment.
async fn connect_store() -> Result<PgKvStore, CliError> {
    let database_url = database_url_from_env()?.ok_or(CliError::MissingDatabaseUrl)?;
    tracing::info!("Connecting to catalog database...");
    let pool = create_pool(&database_url).await?;
    Ok(PgKvStore::new(pool))
}

/// Print a command result as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
