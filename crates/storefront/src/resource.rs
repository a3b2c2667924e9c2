//! Data resources for the configurator UI.
//!
//! A [`Resource`] wraps one catalog query and tracks its state:
//! `Loading`, `Ready(data)` or `Failed(message)`. Loading goes through the
//! client's cache and the retry policy, so transient failures are retried
//! with backoff before the resource reports them.

use async_trait::async_trait;

use cushion_core::{Fabric, FabricCategory, FabricFilter};

use crate::client::CatalogClient;
use crate::error::ApiError;
use crate::retry::RetryPolicy;

/// A query a [`Resource`] can run against the catalog.
#[async_trait]
pub trait Query: Send + Sync {
    type Output: Send;

    async fn fetch(&self, client: &CatalogClient) -> Result<Self::Output, ApiError>;
}

/// The fabric list for a filter.
#[derive(Debug, Clone)]
pub struct FabricsQuery(pub FabricFilter);

#[async_trait]
impl Query for FabricsQuery {
    type Output = Vec<Fabric>;

    async fn fetch(&self, client: &CatalogClient) -> Result<Vec<Fabric>, ApiError> {
        client.fabrics(&self.0).await
    }
}

/// The category summary.
#[derive(Debug, Clone, Copy)]
pub struct CategoriesQuery;

#[async_trait]
impl Query for CategoriesQuery {
    type Output = Vec<FabricCategory>;

    async fn fetch(&self, client: &CatalogClient) -> Result<Vec<FabricCategory>, ApiError> {
        client.categories().await
    }
}

/// Load state of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> ResourceState<T> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The loaded data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Ready(data) => Some(data),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    /// The failure message, if the last load failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            Self::Loading | Self::Ready(_) => None,
        }
    }
}

/// A catalog query with its current load state.
pub struct Resource<Q: Query> {
    client: CatalogClient,
    query: Q,
    retry: RetryPolicy,
    state: ResourceState<Q::Output>,
}

impl<Q> std::fmt::Debug for Resource<Q>
where
    Q: Query + std::fmt::Debug,
    Q::Output: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("query", &self.query)
            .field("retry", &self.retry)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Resource<FabricsQuery> {
    /// Fabrics matching `filter`.
    #[must_use]
    pub fn fabrics(client: CatalogClient, filter: FabricFilter) -> Self {
        Self::new(client, FabricsQuery(filter))
    }
}

impl Resource<CategoriesQuery> {
    /// Categories with their active-fabric counts.
    #[must_use]
    pub fn categories(client: CatalogClient) -> Self {
        Self::new(client, CategoriesQuery)
    }
}

impl<Q: Query> Resource<Q> {
    /// A resource in the `Loading` state with the default retry policy.
    #[must_use]
    pub fn new(client: CatalogClient, query: Q) -> Self {
        Self {
            client,
            query,
            retry: RetryPolicy::default(),
            state: ResourceState::Loading,
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &ResourceState<Q::Output> {
        &self.state
    }

    /// Load the data unless it is already loaded.
    pub async fn load(&mut self) -> &ResourceState<Q::Output> {
        if matches!(self.state, ResourceState::Ready(_)) {
            return &self.state;
        }
        self.refetch().await
    }

    /// Fetch again, whatever the current state. Cached responses are still
    /// served by the client until they expire or are invalidated.
    pub async fn refetch(&mut self) -> &ResourceState<Q::Output> {
        self.state = ResourceState::Loading;
        let client = &self.client;
        let query = &self.query;
        self.state = match self.retry.run(|| query.fetch(client)).await {
            Ok(data) => ResourceState::Ready(data),
            Err(e) => {
                tracing::warn!(error = %e, "catalog resource failed to load");
                ResourceState::Failed(e.to_string())
            }
        };
        &self.state
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
    use serde_json::{Value, json};
    use url::Url;

    use super::*;
    use crate::config::ClientConfig;

    /// Categories endpoint that fails with 503 for the first `failures` calls.
    async fn spawn_flaky(failures: usize) -> (CatalogClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/fabric-categories",
                get(
                    move |State(calls): State<Arc<AtomicUsize>>| async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < failures {
                            (
                                StatusCode::SERVICE_UNAVAILABLE,
                                Json(json!({ "error": "warming up" })),
                            )
                        } else {
                            (
                                StatusCode::OK,
                                Json(json!([
                                    { "name": "sunproof", "count": 3, "displayName": "Sunproof" }
                                ])),
                            )
                        }
                    },
                ),
            )
            .route(
                "/fabrics",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json::<Value>(json!({ "error": "bad filter" })),
                    )
                }),
            )
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        (CatalogClient::new(&ClientConfig::new(base)).unwrap(), calls)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: std::time::Duration::from_millis(1),
            step: std::time::Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let (client, _) = spawn_flaky(0).await;
        let resource = Resource::categories(client);
        assert!(resource.state().is_loading());
    }

    #[tokio::test]
    async fn test_load_retries_transient_failures() {
        let (client, calls) = spawn_flaky(2).await;
        let mut resource = Resource::categories(client).with_retry(fast_retry());

        let state = resource.load().await;
        assert_eq!(state.data().unwrap()[0].name, "sunproof");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_load_fails_after_retries() {
        let (client, calls) = spawn_flaky(10).await;
        let mut resource = Resource::categories(client).with_retry(fast_retry());

        let state = resource.load().await;
        assert_eq!(state.error(), Some("warming up"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let (client, _) = spawn_flaky(0).await;
        let mut resource = Resource::fabrics(client, FabricFilter::active_only());

        let state = resource.load().await;
        assert_eq!(state.error(), Some("bad filter"));
    }

    #[tokio::test]
    async fn test_load_is_idempotent_once_ready() {
        let (client, calls) = spawn_flaky(0).await;
        let mut resource = Resource::categories(client.clone());

        resource.load().await;
        client.clear_cache().await;
        resource.load().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        resource.refetch().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
