//! HTTP route handlers for the catalog API.
//!
//! # Route Structure
//!
//! All routes below are mounted under the configured base path (default
//! `/api`). `/health` is also served at the root.
//!
//! ```text
//! GET  /health                          - Health check
//!
//! # Fabrics
//! GET    /fabrics?category=&active=     - List fabrics
//! GET    /fabrics/{id}                  - Fabric detail
//! POST   /fabrics                       - Create fabric
//! PUT    /fabrics/{id}                  - Update fabric
//! DELETE /fabrics/{id}                  - Delete fabric
//! POST   /fabrics/initialize            - Report fabric count (no seeding)
//! GET    /fabric-categories             - Categories with active counts
//! POST   /fabrics/cleanup-defaults      - Delete non-sunproof fabrics
//! POST   /fabrics/sync-storage          - Sync fabrics from a storage bucket
//!
//! # Storage (diagnostics)
//! GET  /storage/buckets                 - List buckets
//! GET  /storage/files/{bucket}          - First 100 entries of a bucket
//!
//! # Admin roles
//! GET  /admin/check/{userId}            - Is the user an admin
//! GET  /admin/role/{userId}             - The user's role
//! POST /admin/set-role                  - Assign a role
//! POST /admin/remove-role               - Demote to customer
//! GET  /admin/list                      - List admins
//! POST /admin/initialize                - Register the first admin's email
//! POST /admin/claim                     - Promote a pending first admin
//! ```

pub mod admin;
pub mod fabrics;
pub mod storage;

use axum::{Json, Router, extract::rejection::JsonRejection, routing::get};
use serde_json::{Value, json};

use crate::{error::AppError, state::AppState};

/// Build the API router (without base path or middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(fabrics::router())
        .merge(storage::router())
        .merge(admin::router())
}

/// Liveness health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Unwrap a JSON body, turning rejections into a JSON 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Treat a missing or empty string field as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
