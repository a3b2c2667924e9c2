//! Catalog API client.
//!
//! Reads (fabric list, fabric detail, categories) are cached for five
//! minutes. Writes invalidate the affected keys once the server has accepted
//! them, never before.
//!
//! # Cache keys
//!
//! - `fabrics:<filter as JSON>` - fabric lists
//! - `fabric:<id>` - single fabrics
//! - `fabric-categories` - category summary

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use cushion_core::{Fabric, FabricCategory, FabricFilter, FabricPatch, NewFabric};

use crate::cache::TtlCache;
use crate::config::ClientConfig;
use crate::error::ApiError;

const FABRICS_PREFIX: &str = "fabrics:";
const CATEGORIES_KEY: &str = "fabric-categories";

/// Cached response bodies.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Fabrics(Vec<Fabric>),
    Fabric(Box<Fabric>),
    Categories(Vec<FabricCategory>),
}

/// Result of `POST /fabrics/initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitializeReport {
    pub message: String,
    pub count: usize,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Result of a storage sync.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub message: String,
    pub count: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub bucket: String,
    pub processed_files: Vec<String>,
    pub total_files_in_bucket: usize,
}

/// Result of removing the non-sunproof fabrics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub message: String,
    pub deleted: usize,
    pub remaining: usize,
    pub deleted_ids: Vec<String>,
}

/// A bucket as listed by the storage diagnostics route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageBucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

/// A bucket entry as listed by the storage diagnostics route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageFile {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct FabricEnvelope {
    fabric: Fabric,
}

#[derive(Deserialize)]
struct BucketsEnvelope {
    #[serde(default)]
    buckets: Vec<StorageBucket>,
}

#[derive(Deserialize)]
struct FilesEnvelope {
    #[serde(default)]
    files: Vec<StorageFile>,
}

#[derive(Serialize)]
struct SyncBody<'a> {
    bucket: &'a str,
}

/// Client for the catalog API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: TtlCache<CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                .map_err(|e| ApiError::Config(format!("Invalid API key format: {e}")))?;
            auth.set_sensitive(true);
            headers.insert("Authorization", auth);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: builder.build()?,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache: TtlCache::with_default_ttl(config.cache_ttl),
            }),
        })
    }

    /// The response cache.
    #[must_use]
    pub fn cache(&self) -> &TtlCache<CacheValue> {
        &self.inner.cache
    }

    /// Drop every cached response.
    pub async fn clear_cache(&self) {
        self.inner.cache.clear().await;
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.inner.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.inner.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Parse a 2xx body, or turn anything else into [`ApiError::Status`].
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }
        Err(Self::parse_error(response).await)
    }

    /// Use the server's `error` string, else `HTTP <code>: <reason>`.
    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| json.get("error")?.as_str().map(str::to_owned))
            .unwrap_or_else(|| {
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                )
            });

        ApiError::Status {
            status: status.as_u16(),
            message,
        }
    }

    // =========================================================================
    // Reads (cached)
    // =========================================================================

    /// Fabrics matching `filter`, sorted by display order then name.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn fabrics(&self, filter: &FabricFilter) -> Result<Vec<Fabric>, ApiError> {
        let cache_key = fabrics_cache_key(filter)?;
        if let Some(CacheValue::Fabrics(fabrics)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for fabrics");
            return Ok(fabrics);
        }

        let mut params = Vec::new();
        if let Some(category) = &filter.category {
            params.push(format!("category={}", urlencoding::encode(category)));
        }
        if let Some(active) = filter.active {
            params.push(format!("active={active}"));
        }
        let path = if params.is_empty() {
            "/fabrics".to_string()
        } else {
            format!("/fabrics?{}", params.join("&"))
        };

        let fabrics: Vec<Fabric> = self.get_json(&path).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Fabrics(fabrics.clone()))
            .await;
        Ok(fabrics)
    }

    /// One fabric by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 if the fabric does not exist.
    #[instrument(skip(self))]
    pub async fn fabric(&self, id: &str) -> Result<Fabric, ApiError> {
        let cache_key = format!("fabric:{id}");
        if let Some(CacheValue::Fabric(fabric)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for fabric");
            return Ok(*fabric);
        }

        let fabric: Fabric = self
            .get_json(&format!("/fabrics/{}", urlencoding::encode(id)))
            .await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Fabric(Box::new(fabric.clone())))
            .await;
        Ok(fabric)
    }

    /// Categories with the number of active fabrics in each.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<FabricCategory>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(CATEGORIES_KEY).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<FabricCategory> = self.get_json("/fabric-categories").await?;
        self.inner
            .cache
            .insert(CATEGORIES_KEY, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    // =========================================================================
    // Writes (invalidate on success)
    // =========================================================================

    /// Create a fabric.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 400 on missing fields or 409 if the id
    /// is taken.
    #[instrument(skip(self, fabric), fields(id = ?fabric.id))]
    pub async fn create_fabric(&self, fabric: &NewFabric) -> Result<Fabric, ApiError> {
        let envelope: FabricEnvelope = self.post_json("/fabrics", Some(fabric)).await?;
        self.invalidate_lists().await;
        Ok(envelope.fabric)
    }

    /// Merge `patch` into a fabric.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 if the fabric does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update_fabric(&self, id: &str, patch: &FabricPatch) -> Result<Fabric, ApiError> {
        let response = self
            .inner
            .client
            .put(self.url(&format!("/fabrics/{}", urlencoding::encode(id))))
            .json(patch)
            .send()
            .await?;
        let envelope: FabricEnvelope = Self::handle_response(response).await?;
        self.invalidate_fabric(id).await;
        Ok(envelope.fabric)
    }

    /// Delete a fabric.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 if the fabric does not exist.
    #[instrument(skip(self))]
    pub async fn delete_fabric(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .delete(self.url(&format!("/fabrics/{}", urlencoding::encode(id))))
            .send()
            .await?;
        let _: IgnoredAny = Self::handle_response(response).await?;
        self.invalidate_fabric(id).await;
        Ok(())
    }

    /// Ask the server how many fabrics exist. Nothing is seeded.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn initialize_fabrics(&self) -> Result<InitializeReport, ApiError> {
        let report = self.post_json::<(), _>("/fabrics/initialize", None).await?;
        self.clear_cache().await;
        Ok(report)
    }

    /// Sync fabrics from `bucket`, or from the auto-selected sunproof bucket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 when no bucket matches or it is
    /// empty, 500 when storage listing fails.
    #[instrument(skip(self))]
    pub async fn sync_storage(&self, bucket: Option<&str>) -> Result<SyncReport, ApiError> {
        let body = bucket.map(|bucket| SyncBody { bucket });
        let report = self
            .post_json("/fabrics/sync-storage", body.as_ref())
            .await?;
        self.clear_cache().await;
        Ok(report)
    }

    /// Delete every fabric outside the sunproof category.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn cleanup_defaults(&self) -> Result<CleanupReport, ApiError> {
        let report = self
            .post_json::<(), _>("/fabrics/cleanup-defaults", None)
            .await?;
        self.clear_cache().await;
        Ok(report)
    }

    // =========================================================================
    // Storage diagnostics (not cached)
    // =========================================================================

    /// Buckets in object storage.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn storage_buckets(&self) -> Result<Vec<StorageBucket>, ApiError> {
        let envelope: BucketsEnvelope = self.get_json("/storage/buckets").await?;
        Ok(envelope.buckets)
    }

    /// First entries of a bucket.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn storage_files(&self, bucket: &str) -> Result<Vec<StorageFile>, ApiError> {
        let envelope: FilesEnvelope = self
            .get_json(&format!("/storage/files/{}", urlencoding::encode(bucket)))
            .await?;
        Ok(envelope.files)
    }

    async fn invalidate_lists(&self) {
        self.inner.cache.invalidate(FABRICS_PREFIX).await;
        self.inner.cache.invalidate(CATEGORIES_KEY).await;
    }

    async fn invalidate_fabric(&self, id: &str) {
        self.invalidate_lists().await;
        self.inner.cache.invalidate(&format!("fabric:{id}")).await;
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// `fabrics:` followed by the filter as JSON (`{}` when unfiltered).
fn fabrics_cache_key(filter: &FabricFilter) -> Result<String, ApiError> {
    let json = serde_json::to_string(filter).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(format!("{FABRICS_PREFIX}{json}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        routing::{get, put},
    };
    use serde_json::{Value, json};
    use url::Url;

    use super::*;

    #[derive(Clone, Default)]
    struct Hits(Arc<AtomicUsize>);

    fn fabric_json(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "category": "sunproof",
            "color": "#E8DCC6",
            "description": "",
            "pricePerMeter": 45.0,
            "composition": "100% Polyester",
            "waterResistant": true,
            "uvResistant": true,
            "active": true,
            "order": 100,
            "tags": [],
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z",
        })
    }

    async fn list(State(hits): State<Hits>) -> Json<Value> {
        let n = hits.0.fetch_add(1, Ordering::SeqCst);
        Json(json!([fabric_json("sunproof-a", &format!("A{n}"))]))
    }

    async fn update(State(hits): State<Hits>) -> Json<Value> {
        hits.0.fetch_add(100, Ordering::SeqCst);
        Json(json!({ "message": "Fabric updated successfully", "fabric": fabric_json("sunproof-a", "A") }))
    }

    async fn missing() -> (StatusCode, Json<Value>) {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "Fabric not found" })))
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::BAD_GATEWAY, "upstream exploded")
    }

    async fn spawn_stub() -> (CatalogClient, Hits) {
        let hits = Hits::default();
        let app = Router::new()
            .route("/api/fabrics", get(list))
            .route("/api/fabrics/sunproof-a", put(update))
            .route("/api/fabrics/missing", get(missing))
            .route("/api/fabric-categories", get(broken))
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = Url::parse(&format!("http://{addr}/api")).unwrap();
        (CatalogClient::new(&ClientConfig::new(base)).unwrap(), hits)
    }

    #[test]
    fn test_fabrics_cache_key() {
        assert_eq!(
            fabrics_cache_key(&FabricFilter::default()).unwrap(),
            "fabrics:{}"
        );
        assert_eq!(
            fabrics_cache_key(&FabricFilter::active_only()).unwrap(),
            "fabrics:{\"active\":true}"
        );
    }

    #[tokio::test]
    async fn test_reads_are_cached() {
        let (client, hits) = spawn_stub().await;
        let filter = FabricFilter::default();

        let first = client.fabrics(&filter).await.unwrap();
        let second = client.fabrics(&filter).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(hits.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_invalidates_lists() {
        let (client, hits) = spawn_stub().await;
        let filter = FabricFilter::default();

        client.fabrics(&filter).await.unwrap();
        client
            .update_fabric("sunproof-a", &FabricPatch::default())
            .await
            .unwrap();
        let refreshed = client.fabrics(&filter).await.unwrap();

        assert_eq!(hits.0.load(Ordering::SeqCst), 102);
        assert_eq!(refreshed[0].name, "A101");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let (client, hits) = spawn_stub().await;
        let filter = FabricFilter::default();

        client.fabrics(&filter).await.unwrap();
        let err = client.delete_fabric("sunproof-a").await.unwrap_err();
        assert_eq!(err.status(), Some(405));

        client.fabrics(&filter).await.unwrap();
        assert_eq!(hits.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_carries_server_message() {
        let (client, _) = spawn_stub().await;
        let err = client.fabric("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Fabric not found");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_error_without_json_body_uses_status_line() {
        let (client, _) = spawn_stub().await;
        let err = client.categories().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        assert!(err.is_retryable());
    }
}
