//! Object-storage diagnostics, used by the admin UI to pick a bucket.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;

use crate::{
    error::AppError,
    state::AppState,
    storage::{Bucket, FileObject, ListOptions},
};

/// Entries returned by the file listing.
const FILE_PREVIEW_LIMIT: usize = 100;

/// Build the storage router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/storage/buckets", get(list_buckets))
        .route("/storage/files/{bucket}", get(list_files))
}

#[derive(Debug, Serialize)]
pub struct BucketsResponse {
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub bucket: String,
    pub files: Vec<FileObject>,
}

/// List every bucket.
///
/// # Errors
///
/// Returns 500 if storage cannot be reached.
#[tracing::instrument(skip(state))]
pub async fn list_buckets(State(state): State<AppState>) -> Result<Json<BucketsResponse>, AppError> {
    let buckets = state
        .storage()
        .list_buckets()
        .await
        .map_err(|e| AppError::storage("Failed to list buckets", e))?;
    Ok(Json(BucketsResponse { buckets }))
}

/// First entries of a bucket, sorted by name.
///
/// # Errors
///
/// Returns 500 if the listing fails, including for unknown buckets.
#[tracing::instrument(skip(state))]
pub async fn list_files(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Json<FilesResponse>, AppError> {
    let files = state
        .storage()
        .list_files(
            &bucket,
            ListOptions {
                limit: FILE_PREVIEW_LIMIT,
                offset: 0,
            },
        )
        .await
        .map_err(|e| AppError::storage(format!("Failed to list files in bucket \"{bucket}\""), e))?;
    Ok(Json(FilesResponse { bucket, files }))
}
