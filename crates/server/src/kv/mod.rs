//! Generic key-value store.
//!
//! Every catalog entity (fabrics, admin roles) is stored as a JSON document
//! under a string key. The store offers no transactions; callers that touch
//! several keys do so one awaited call at a time.
//!
//! # Backends
//!
//! - [`PgKvStore`] - `PostgreSQL` table `kv_store(key, value JSONB)`
//! - [`MemoryKvStore`] - ordered in-memory map for tests and local development

mod memory;
mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryKvStore;
pub use postgres::{MIGRATOR, PgKvStore, create_pool};

/// Errors returned by a key-value backend.
#[derive(Debug, Error)]
pub enum KvError {
    /// The database rejected the query or the connection failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend is not accepting operations.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Storage interface for opaque JSON values.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a single value. Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> KvResult<Option<Value>>;

    /// Write a value, replacing any existing one.
    async fn set(&self, key: &str, value: Value) -> KvResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> KvResult<()>;

    /// All values whose key starts with `prefix`, ordered by key.
    ///
    /// Only values are returned; entities carry their own id.
    async fn get_by_prefix(&self, prefix: &str) -> KvResult<Vec<Value>>;

    /// Remove several keys in one call.
    async fn mdel(&self, keys: &[String]) -> KvResult<()>;
}
