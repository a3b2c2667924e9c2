//! Integration tests for the cushion catalog.
//!
//! Each test spawns the real catalog router on an ephemeral port, backed by
//! in-memory key-value and object stores, and drives it over HTTP with the
//! storefront [`CatalogClient`].
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cushion-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog_fabrics` - Fabric CRUD and client cache coherence
//! - `catalog_sync` - Storage sync, cleanup and storage browsing
//! - `catalog_admin` - Admin roles and first-admin bootstrap

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::{net::SocketAddr, sync::Arc};

use cushion_server::{
    config::HttpConfig, kv::MemoryKvStore, state::AppState, storage::MemoryStorage,
};
use cushion_storefront::{CatalogClient, ClientConfig};
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

/// A catalog server running on a local port.
///
/// The server task is aborted when this is dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub storage: Arc<MemoryStorage>,
    pub kv: Arc<MemoryKvStore>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with empty stores, mounted under `/api`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let kv = Arc::new(MemoryKvStore::new());
        let state = AppState::new(kv.clone(), storage.clone());
        let app = cushion_server::app(state, &HttpConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            storage,
            kv,
            handle,
        }
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:4321/api`.
    ///
    /// # Panics
    ///
    /// Panics if the address does not form a valid URL.
    #[must_use]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("Invalid test server URL")
    }

    /// A fresh client with its own empty cache.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client fails to build.
    #[must_use]
    pub fn client(&self) -> CatalogClient {
        CatalogClient::new(&ClientConfig::new(self.api_url()))
            .expect("Failed to create catalog client")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
