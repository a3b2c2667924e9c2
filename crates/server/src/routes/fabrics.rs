//! Fabric catalog handlers.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use cushion_core::{Fabric, FabricCategory, FabricFilter, FabricId, FabricPatch, NewFabric};

use super::{json_body, non_empty};
use crate::{
    db::{CleanupReport, FabricRepository, RepositoryError},
    error::AppError,
    services::{FabricSync, SyncSummary},
    state::AppState,
};

/// Build the fabrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fabrics", get(list_fabrics).post(create_fabric))
        .route("/fabrics/initialize", post(initialize_fabrics))
        .route("/fabrics/cleanup-defaults", post(cleanup_defaults))
        .route("/fabrics/sync-storage", post(sync_storage))
        .route(
            "/fabrics/{id}",
            get(get_fabric).put(update_fabric).delete(delete_fabric),
        )
        .route("/fabric-categories", get(list_categories))
}

/// Query parameters for the fabric list. Kept as raw strings so any
/// `active` value other than `"true"` means inactive.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub active: Option<String>,
}

/// Response for create and update.
#[derive(Debug, Serialize)]
pub struct FabricResponse {
    pub message: &'static str,
    pub fabric: Fabric,
}

/// Response for delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    pub id: FabricId,
}

/// Response for initialize.
#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub message: &'static str,
    pub count: usize,
    pub hint: &'static str,
}

/// Response for cleanup.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: CleanupReport,
}

/// Optional body of a sync request.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    pub bucket: Option<String>,
}

/// Response for a completed sync.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: SyncSummary,
}

fn fabric_not_found(error: RepositoryError) -> AppError {
    match error {
        RepositoryError::NotFound => AppError::NotFound("Fabric not found".to_string()),
        other => other.into(),
    }
}

/// List fabrics, optionally filtered by category and active flag.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn list_fabrics(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Fabric>>, AppError> {
    let filter = FabricFilter::from_query(query.category.as_deref(), query.active.as_deref());
    let fabrics = FabricRepository::new(state.kv()).list(&filter).await?;
    Ok(Json(fabrics))
}

/// Get one fabric.
///
/// # Errors
///
/// Returns 404 if the fabric does not exist.
#[tracing::instrument(skip(state))]
pub async fn get_fabric(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Fabric>, AppError> {
    let fabric = FabricRepository::new(state.kv())
        .get(&id)
        .await
        .map_err(fabric_not_found)?;
    Ok(Json(fabric))
}

/// Create a fabric.
///
/// # Errors
///
/// Returns 400 if id, name or category is missing, 409 if the id is taken.
#[tracing::instrument(skip(state, body))]
pub async fn create_fabric(
    State(state): State<AppState>,
    body: Result<Json<NewFabric>, JsonRejection>,
) -> Result<(StatusCode, Json<FabricResponse>), AppError> {
    let input = json_body(body)?;
    let fabric = FabricRepository::new(state.kv()).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(FabricResponse {
            message: "Fabric created successfully",
            fabric,
        }),
    ))
}

/// Merge changes into a fabric. The id in the path always wins.
///
/// # Errors
///
/// Returns 404 if the fabric does not exist.
#[tracing::instrument(skip(state, body))]
pub async fn update_fabric(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FabricPatch>, JsonRejection>,
) -> Result<Json<FabricResponse>, AppError> {
    let patch = json_body(body)?;
    let fabric = FabricRepository::new(state.kv())
        .update(&id, patch)
        .await
        .map_err(fabric_not_found)?;
    Ok(Json(FabricResponse {
        message: "Fabric updated successfully",
        fabric,
    }))
}

/// Delete a fabric.
///
/// # Errors
///
/// Returns 404 if the fabric does not exist.
#[tracing::instrument(skip(state))]
pub async fn delete_fabric(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    FabricRepository::new(state.kv())
        .delete(&id)
        .await
        .map_err(fabric_not_found)?;
    Ok(Json(DeleteResponse {
        message: "Fabric deleted successfully",
        id: FabricId::new(id),
    }))
}

/// Report how many fabrics exist. Nothing is seeded; fabrics come from a
/// storage sync.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn initialize_fabrics(
    State(state): State<AppState>,
) -> Result<Json<InitializeResponse>, AppError> {
    let count = FabricRepository::new(state.kv()).count().await?;
    Ok(Json(InitializeResponse {
        message: "No default fabrics. Use 'Sync from Storage' to load fabrics from Supabase.",
        count,
        hint: "Upload fabric images to Supabase Storage bucket 'SUNPROOF SELECTIE' and click 'Sync from Storage'",
    }))
}

/// Categories with the number of active fabrics in each.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<FabricCategory>>, AppError> {
    let categories = FabricRepository::new(state.kv()).categories().await?;
    Ok(Json(categories))
}

/// Delete every fabric outside the sunproof category.
///
/// # Errors
///
/// Returns 500 if the store cannot be read or written.
#[tracing::instrument(skip(state))]
pub async fn cleanup_defaults(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, AppError> {
    let report = FabricRepository::new(state.kv())
        .cleanup_non_sunproof()
        .await?;
    Ok(Json(CleanupResponse {
        message: format!(
            "Deleted {} default fabrics. Only Sunproof fabrics remain.",
            report.deleted
        ),
        report,
    }))
}

/// Sync fabrics from object storage.
///
/// The body is optional; a missing or malformed body syncs the
/// auto-selected bucket.
///
/// # Errors
///
/// Returns 404 when no bucket matches or the bucket is empty, 500 when
/// storage listing or a store write fails.
#[tracing::instrument(skip(state, body))]
pub async fn sync_storage(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SyncResponse>, AppError> {
    let request: SyncRequest = serde_json::from_slice(&body).unwrap_or_default();
    let bucket = non_empty(request.bucket);
    tracing::info!(requested = bucket.as_deref(), "storage sync triggered");

    let summary = FabricSync::new(state.storage(), state.kv())
        .run(bucket.as_deref())
        .await?;
    Ok(Json(SyncResponse {
        message: summary.message(),
        summary,
    }))
}
