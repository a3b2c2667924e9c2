//! Fabric maintenance commands.
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY` - storage access (sync only)

use cushion_server::{
    config::SupabaseConfig,
    db::FabricRepository,
    services::{FabricSync, SyncError},
    storage::SupabaseStorage,
};

use super::{CliError, connect_store, print_json};

/// Sync fabrics from `bucket`, or from the auto-selected sunproof bucket.
///
/// # Errors
///
/// Returns error if configuration is missing, no bucket matches, the bucket
/// is empty, or a store write fails.
pub async fn sync(bucket: Option<&str>) -> Result<(), CliError> {
    let store = connect_store().await?;
    let storage = SupabaseStorage::new(&SupabaseConfig::from_env()?)?;

    tracing::info!(bucket, "Syncing fabrics from storage...");
    let summary = match FabricSync::new(&storage, &store).run(bucket).await {
        Ok(summary) => summary,
        Err(SyncError::NoSuitableBucket { available, requested }) => {
            let names: Vec<&str> = available.iter().map(|b| b.name.as_str()).collect();
            tracing::error!(?requested, available = ?names, "no suitable bucket");
            return Err(SyncError::NoSuitableBucket { available, requested }.into());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("{}", summary.message());
    print_json(&summary)
}

/// Delete every fabric outside the sunproof category.
///
/// # Errors
///
/// Returns error if the store cannot be read or written.
pub async fn cleanup() -> Result<(), CliError> {
    let store = connect_store().await?;

    let report = FabricRepository::new(&store).cleanup_non_sunproof().await?;

    tracing::info!(
        "Deleted {} fabrics, {} remain",
        report.deleted,
        report.remaining
    );
    print_json(&report)
}
