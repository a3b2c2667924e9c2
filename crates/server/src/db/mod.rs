//! Repositories over the key-value store.
//!
//! # Key layout
//!
//! - `fabric:<id>` - one [`Fabric`](cushion_core::Fabric) document per fabric
//! - `user:<id>:role` - role string (`admin` or `customer`)
//! - `admin:users` - array of admin user ids
//! - `admin:email:<email>` - user id registered for an admin email
//! - `admin:setup:email` - email awaiting promotion to first admin
//!
//! Repositories borrow the store for the duration of a request:
//! ```rust,ignore
//! let fabrics = FabricRepository::new(state.kv()).list(&filter).await?;
//! ```

pub mod admin_roles;
pub mod fabrics;

use thiserror::Error;

pub use admin_roles::{AdminEntry, AdminRoleError, AdminRoleRepository};
pub use fabrics::{CleanupReport, FabricRepository};

use crate::kv::KvError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The key-value backend failed.
    #[error("store error: {0}")]
    Store(#[from] KvError),

    /// A stored document could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A document could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Entity already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),
}

/// Decode a stored document, reporting the key on failure.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    key: &str,
    value: serde_json::Value,
) -> Result<T, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid document at {key}: {e}")))
}

/// Encode a document for storage.
pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}
