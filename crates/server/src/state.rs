//! Application state shared across handlers.

use std::sync::Arc;

use crate::kv::KvStore;
use crate::storage::ObjectStorage;

/// Application state shared across all handlers.
///
/// Cheap to clone; the backends live behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    kv: Arc<dyn KvStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Create application state from a key-value store and object storage.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { kv, storage }),
        }
    }

    /// Key-value store holding fabrics and roles.
    #[must_use]
    pub fn kv(&self) -> &dyn KvStore {
        self.inner.kv.as_ref()
    }

    /// Shared handle to the key-value store, for background tasks.
    #[must_use]
    pub fn kv_handle(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.inner.kv)
    }

    /// Object storage holding fabric images.
    #[must_use]
    pub fn storage(&self) -> &dyn ObjectStorage {
        self.inner.storage.as_ref()
    }

    /// Shared handle to object storage, for background tasks.
    #[must_use]
    pub fn storage_handle(&self) -> Arc<dyn ObjectStorage> {
        Arc::clone(&self.inner.storage)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
