//! Supabase Storage REST client.
//!
//! # API Reference
//!
//! - List buckets: `GET /storage/v1/bucket`
//! - List objects: `POST /storage/v1/object/list/<bucket>`
//! - Public objects: `/storage/v1/object/public/<bucket>/<path>`
//! - Authentication: `Authorization: Bearer <service-role key>` plus `apikey`

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{Bucket, FileObject, ListOptions, ObjectStorage, StorageError, public_object_url};
use crate::config::SupabaseConfig;

/// Supabase Storage client using the service-role key.
#[derive(Clone)]
pub struct SupabaseStorage {
    inner: Arc<SupabaseStorageInner>,
}

struct SupabaseStorageInner {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

impl SupabaseStorage {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StorageError> {
        let key = config.service_role_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| StorageError::Parse(format!("Invalid service role key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);

        let mut apikey = HeaderValue::from_str(key)
            .map_err(|e| StorageError::Parse(format!("Invalid service role key: {e}")))?;
        apikey.set_sensitive(true);
        headers.insert("apikey", apikey);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseStorageInner {
                client,
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StorageError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| StorageError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Extract `message` or `error` from a JSON error body, else use the raw text.
    async fn parse_error(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                ["message", "error"]
                    .iter()
                    .find_map(|field| json.get(field)?.as_str().map(str::to_owned))
            })
            .unwrap_or(body);

        StorageError::Api { status, message }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    #[tracing::instrument(skip(self))]
    async fn list_buckets(&self) -> Result<Vec<Bucket>, StorageError> {
        let url = format!("{}/storage/v1/bucket", self.inner.base_url);
        let response = self.inner.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_files(
        &self,
        bucket: &str,
        options: ListOptions,
    ) -> Result<Vec<FileObject>, StorageError> {
        let url = format!(
            "{}/storage/v1/object/list/{}",
            self.inner.base_url,
            urlencoding::encode(bucket)
        );
        let body = ListRequest {
            prefix: "",
            limit: options.limit,
            offset: options.offset,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let response = self.inner.client.post(&url).json(&body).send().await?;
        Self::handle_response(response).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(&self.inner.base_url, bucket, path)
    }
}

impl std::fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}
