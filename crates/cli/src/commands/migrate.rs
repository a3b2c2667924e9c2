//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cushion migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/server/migrations/`

use cushion_server::kv::MIGRATOR;

use super::{CliError, connect_store};

/// Run the catalog migrations.
///
/// # Errors
///
/// Returns error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let store = connect_store().await?;

    tracing::info!("Running catalog migrations...");
    MIGRATOR.run(store.pool()).await?;

    tracing::info!("Catalog migrations complete!");
    Ok(())
}
