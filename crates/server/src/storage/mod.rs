//! Object storage access.
//!
//! Fabric swatch images and their texture maps live in an object-storage
//! bucket. The sync engine only needs three things from it: the bucket list,
//! a paginated file list, and a public URL for a stored object.
//!
//! # Backends
//!
//! - [`SupabaseStorage`] - Supabase Storage REST API, authenticated with the
//!   service-role key
//! - [`MemoryStorage`] - in-memory buckets for tests

mod memory;
mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStorage;
pub use supabase::SupabaseStorage;

/// Errors that can occur when talking to object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// An entry returned by a file listing.
///
/// Folders are listed alongside files; they have no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl FileObject {
    /// Whether this entry is a folder placeholder rather than a stored object.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.id.is_none() || self.name.is_empty()
    }
}

/// Pagination window for a file listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
}

/// Read access to an object-storage service.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List every bucket, in the order the service returns them.
    async fn list_buckets(&self) -> Result<Vec<Bucket>, StorageError>;

    /// List one page of entries at the bucket root, sorted by name ascending.
    async fn list_files(
        &self,
        bucket: &str,
        options: ListOptions,
    ) -> Result<Vec<FileObject>, StorageError>;

    /// Public URL of an object. Does not check that the object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// `<base>/storage/v1/object/public/<bucket>/<path>` with each path segment
/// percent-encoded.
pub(crate) fn public_object_url(base_url: &str, bucket: &str, path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/storage/v1/object/public/{}/{encoded}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(bucket)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_encodes_segments() {
        let url = public_object_url("https://abc.supabase.co/", "sunproof", "Ocean Blue.png");
        assert_eq!(
            url,
            "https://abc.supabase.co/storage/v1/object/public/sunproof/Ocean%20Blue.png"
        );
    }

    #[test]
    fn test_public_url_keeps_path_separators() {
        let url = public_object_url("https://abc.supabase.co", "b", "maps/Sand & Stone.jpg");
        assert_eq!(
            url,
            "https://abc.supabase.co/storage/v1/object/public/b/maps/Sand%20%26%20Stone.jpg"
        );
    }

    #[test]
    fn test_folder_detection() {
        let folder: FileObject =
            serde_json::from_str(r#"{"name":"archive","id":null,"metadata":null}"#)
                .unwrap_or_else(|e| panic!("{e}"));
        assert!(folder.is_directory());

        let file: FileObject =
            serde_json::from_str(r#"{"name":"Ocean.png","id":"3f1c","metadata":{"size":1024}}"#)
                .unwrap_or_else(|e| panic!("{e}"));
        assert!(!file.is_directory());
    }
}
