//! Unified error handling for the catalog API.
//!
//! Every error response is a JSON object with an `error` string, plus
//! context fields where the caller can act on them (e.g. the buckets that do
//! exist when the requested one does not).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::{AdminRoleError, RepositoryError};
use crate::services::SyncError;
use crate::storage::StorageError;

/// Application-level error type for the catalog API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Admin role operation failed.
    #[error("Admin role error: {0}")]
    AdminRole(#[from] AdminRoleError),

    /// Storage sync failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Direct object-storage call failed; `message` is shown to the client.
    #[error("{message}: {source}")]
    Storage {
        message: String,
        #[source]
        source: StorageError,
    },

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    /// Wrap a storage error with a client-facing message.
    pub fn storage(message: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            message: message.into(),
            source,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Repository(e) | Self::AdminRole(AdminRoleError::Repository(e)) => {
                repository_status(e)
            }
            Self::AdminRole(AdminRoleError::AdminsExist { .. }) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Sync(SyncError::NoSuitableBucket { .. } | SyncError::NoFiles { .. })
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Sync(_) | Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body. Store internals are never included.
    fn body(&self) -> Value {
        match self {
            Self::Repository(e) | Self::AdminRole(AdminRoleError::Repository(e)) => {
                repository_body(e)
            }
            Self::AdminRole(e @ AdminRoleError::AdminsExist { existing_admins }) => json!({
                "error": e.to_string(),
                "existingAdmins": existing_admins,
            }),
            Self::Sync(e) => sync_body(e),
            Self::Storage { message, source } => json!({
                "error": message,
                "details": source.to_string(),
            }),
            Self::NotFound(message) | Self::BadRequest(message) => json!({ "error": message }),
        }
    }
}

fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Validation(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Store(_)
        | RepositoryError::DataCorruption(_)
        | RepositoryError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repository_body(error: &RepositoryError) -> Value {
    match error {
        RepositoryError::NotFound => json!({ "error": "Not found" }),
        RepositoryError::Conflict(message) | RepositoryError::Validation(message) => {
            json!({ "error": message })
        }
        RepositoryError::Store(_)
        | RepositoryError::DataCorruption(_)
        | RepositoryError::Serialization(_) => json!({ "error": "Internal server error" }),
    }
}

fn sync_body(error: &SyncError) -> Value {
    match error {
        SyncError::BucketListing(source) | SyncError::FileListing { source, .. } => json!({
            "error": error.to_string(),
            "details": source.to_string(),
        }),
        SyncError::NoSuitableBucket {
            available,
            requested,
        } => {
            let message = requested.as_ref().map_or_else(
                || {
                    "Geen bucket met \"sunproof\" in de naam gevonden. Selecteer een bucket handmatig."
                        .to_string()
                },
                |name| format!("Bucket \"{name}\" niet gevonden. Kies een bucket uit de lijst."),
            );
            let buckets: Vec<Value> = available
                .iter()
                .map(|b| json!({ "name": b.name, "id": b.id, "public": b.public }))
                .collect();
            json!({
                "error": error.to_string(),
                "availableBuckets": buckets,
                "requestedBucket": requested,
                "message": message,
            })
        }
        SyncError::NoFiles { bucket } => json!({
            "error": error.to_string(),
            "bucket": bucket,
            "message": "Upload afbeeldingen naar de bucket in Supabase Storage",
        }),
        SyncError::Repository(_) => json!({ "error": error.to_string() }),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Catalog request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}
