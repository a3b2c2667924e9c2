//! In-memory object storage for tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Bucket, FileObject, ListOptions, ObjectStorage, StorageError, public_object_url};

const BASE_URL: &str = "https://storage.invalid";

/// In-memory buckets with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<Vec<(Bucket, Vec<FileObject>)>>,
    fail_bucket_listing: AtomicBool,
    fail_file_listing: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty public bucket. Adding an existing bucket is a no-op.
    pub async fn add_bucket(&self, name: &str) {
        let mut buckets = self.buckets.write().await;
        if buckets.iter().any(|(b, _)| b.name == name) {
            return;
        }
        buckets.push((
            Bucket {
                id: name.to_owned(),
                name: name.to_owned(),
                public: true,
                created_at: None,
                updated_at: None,
            },
            Vec::new(),
        ));
    }

    /// Add a file to a bucket, creating the bucket if needed.
    pub async fn add_file(&self, bucket: &str, name: &str) {
        self.push_entry(bucket, name, Some(format!("{bucket}/{name}")))
            .await;
    }

    /// Add a folder placeholder (an entry without an id).
    pub async fn add_folder(&self, bucket: &str, name: &str) {
        self.push_entry(bucket, name, None).await;
    }

    /// Make `list_buckets` fail.
    pub fn fail_bucket_listing(&self, fail: bool) {
        self.fail_bucket_listing.store(fail, Ordering::SeqCst);
    }

    /// Make `list_files` fail.
    pub fn fail_file_listing(&self, fail: bool) {
        self.fail_file_listing.store(fail, Ordering::SeqCst);
    }

    async fn push_entry(&self, bucket: &str, name: &str, id: Option<String>) {
        self.add_bucket(bucket).await;
        let mut buckets = self.buckets.write().await;
        if let Some((_, files)) = buckets.iter_mut().find(|(b, _)| b.name == bucket) {
            files.push(FileObject {
                name: name.to_owned(),
                id,
                created_at: None,
                updated_at: None,
                metadata: None,
            });
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, StorageError> {
        if self.fail_bucket_listing.load(Ordering::SeqCst) {
            return Err(StorageError::Api {
                status: 503,
                message: "bucket listing unavailable".to_string(),
            });
        }
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .map(|(b, _)| b.clone())
            .collect())
    }

    async fn list_files(
        &self,
        bucket: &str,
        options: ListOptions,
    ) -> Result<Vec<FileObject>, StorageError> {
        if self.fail_file_listing.load(Ordering::SeqCst) {
            return Err(StorageError::Api {
                status: 503,
                message: "file listing unavailable".to_string(),
            });
        }

        let buckets = self.buckets.read().await;
        let Some((_, files)) = buckets.iter().find(|(b, _)| b.name == bucket) else {
            return Err(StorageError::Api {
                status: 404,
                message: "Bucket not found".to_string(),
            });
        };

        let mut sorted = files.clone();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sorted
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(BASE_URL, bucket, path)
    }
}
