//! Storage-to-catalog sync.
//!
//! Reads every object in a fabric bucket and upserts one fabric per base
//! image, linking companion texture maps by filename. Fields an admin may
//! have edited (price, description, colour, order, ...) survive a re-sync;
//! only the storage-derived fields are refreshed.
//!
//! There is no bulk commit. A store failure part-way leaves the fabrics
//! processed so far written, and the next run picks up the rest.

pub mod naming;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use cushion_core::{DEFAULT_COLOR, Fabric, SUNPROOF_CATEGORY};

use crate::db::{FabricRepository, RepositoryError};
use crate::kv::KvStore;
use crate::storage::{Bucket, FileObject, ListOptions, ObjectStorage, StorageError};
use naming::{COMPANION_MAPS, MapKind};

/// Objects requested per listing call.
pub const PAGE_SIZE: usize = 1000;

/// Price per meter for fabrics created by a sync.
const DEFAULT_SYNC_PRICE: i64 = 45;
const DEFAULT_COMPOSITION: &str = "100% Solution Dyed Acrylic";
const DEFAULT_TAGS: [&str; 3] = ["sunproof", "premium", "outdoor"];
/// New fabrics are ordered after hand-curated ones, in bucket order.
const SYNC_ORDER_BASE: i32 = 100;

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The bucket list could not be fetched.
    #[error("Failed to list storage buckets")]
    BucketListing(#[source] StorageError),

    /// Neither the requested bucket nor a sunproof bucket exists.
    #[error("No suitable bucket found")]
    NoSuitableBucket {
        available: Vec<Bucket>,
        requested: Option<String>,
    },

    /// Listing the objects of the chosen bucket failed.
    #[error("Failed to process bucket \"{bucket}\"")]
    FileListing {
        bucket: String,
        #[source]
        source: StorageError,
    },

    /// The chosen bucket is empty.
    #[error("No files found in bucket")]
    NoFiles { bucket: String },

    /// Writing a fabric failed.
    #[error("Failed to sync fabrics from storage")]
    Repository(#[from] RepositoryError),
}

/// Result of a completed sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Fabrics written (created + updated).
    pub count: usize,
    pub created: usize,
    pub updated: usize,
    /// Directories, non-images and texture maps.
    pub skipped: usize,
    pub bucket: String,
    /// Base image filenames, in processing order.
    pub processed_files: Vec<String>,
    pub total_files_in_bucket: usize,
}

impl SyncSummary {
    /// Human-readable one-line summary.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Successfully synced {} fabrics from storage bucket \"{}\"",
            self.count, self.bucket
        )
    }
}

/// Public URLs of the companion maps found for one base image.
#[derive(Debug, Default)]
struct MapUrls {
    normal: Option<String>,
    roughness: Option<String>,
    ambient_occlusion: Option<String>,
    displacement: Option<String>,
}

/// Sync engine over an object store and the fabric repository.
pub struct FabricSync<'a> {
    storage: &'a dyn ObjectStorage,
    fabrics: FabricRepository<'a>,
}

impl<'a> FabricSync<'a> {
    #[must_use]
    pub const fn new(storage: &'a dyn ObjectStorage, kv: &'a dyn KvStore) -> Self {
        Self {
            storage,
            fabrics: FabricRepository::new(kv),
        }
    }

    /// Sync fabrics from `requested`, or from the first bucket whose name
    /// contains "sunproof" when no bucket is requested or it does not exist.
    ///
    /// # Errors
    ///
    /// See [`SyncError`]. Fabrics written before a `Repository` error stay written.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, requested: Option<&str>) -> Result<SyncSummary, SyncError> {
        let bucket = self.resolve_bucket(requested).await?;
        let files = self.list_all_files(&bucket).await?;
        tracing::info!(bucket, total = files.len(), "listed bucket");

        if files.is_empty() {
            return Err(SyncError::NoFiles { bucket });
        }

        let now = Utc::now();
        let mut summary = SyncSummary {
            count: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            bucket,
            processed_files: Vec::new(),
            total_files_in_bucket: files.len(),
        };

        for file in &files {
            let Some(stem) = base_image_stem(file) else {
                tracing::debug!(file = %file.name, "skipping entry");
                summary.skipped += 1;
                continue;
            };

            let id = naming::fabric_id(stem);
            let name = naming::display_name(stem);
            let texture_url = self.storage.public_url(&summary.bucket, &file.name);
            let maps = self.companion_urls(&summary.bucket, stem, &files);

            let existing = self.fabrics.find(id.as_str()).await?;
            let is_new = existing.is_none();
            let fabric = match existing {
                Some(mut fabric) => {
                    fabric.name = name;
                    fabric.category = SUNPROOF_CATEGORY.to_string();
                    fabric.texture_pattern = None;
                    fabric.texture_url = Some(texture_url);
                    fabric.normal_map_url = maps.normal;
                    fabric.roughness_map_url = maps.roughness;
                    fabric.ao_map_url = maps.ambient_occlusion;
                    fabric.displacement_map_url = maps.displacement;
                    fabric.updated_at = now;
                    fabric
                }
                None => new_synced_fabric(id, name, texture_url, maps, summary.count, now),
            };

            self.fabrics.upsert(&fabric).await?;
            summary.processed_files.push(file.name.clone());
            summary.count += 1;
            if is_new {
                summary.created += 1;
                tracing::debug!(id = %fabric.id, file = %file.name, "created fabric");
            } else {
                summary.updated += 1;
                tracing::debug!(id = %fabric.id, file = %file.name, "updated fabric");
            }
        }

        tracing::info!(
            bucket = %summary.bucket,
            count = summary.count,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "sync complete"
        );
        Ok(summary)
    }

    async fn resolve_bucket(&self, requested: Option<&str>) -> Result<String, SyncError> {
        let buckets = self
            .storage
            .list_buckets()
            .await
            .map_err(SyncError::BucketListing)?;

        if let Some(name) = requested {
            if buckets.iter().any(|b| b.name == name) {
                return Ok(name.to_string());
            }
            tracing::warn!(requested = name, "requested bucket not found, looking for a sunproof bucket");
        }

        match buckets
            .iter()
            .find(|b| b.name.to_lowercase().contains(SUNPROOF_CATEGORY))
        {
            Some(bucket) => Ok(bucket.name.clone()),
            None => Err(SyncError::NoSuitableBucket {
                available: buckets,
                requested: requested.map(str::to_owned),
            }),
        }
    }

    async fn list_all_files(&self, bucket: &str) -> Result<Vec<FileObject>, SyncError> {
        let mut files = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .storage
                .list_files(
                    bucket,
                    ListOptions {
                        limit: PAGE_SIZE,
                        offset,
                    },
                )
                .await
                .map_err(|source| SyncError::FileListing {
                    bucket: bucket.to_string(),
                    source,
                })?;

            let len = page.len();
            files.extend(page);
            if len < PAGE_SIZE {
                return Ok(files);
            }
            offset += PAGE_SIZE;
        }
    }

    fn companion_urls(&self, bucket: &str, stem: &str, files: &[FileObject]) -> MapUrls {
        let mut urls = MapUrls::default();
        for (kind, tokens) in COMPANION_MAPS {
            let url = naming::find_companion(stem, tokens, files)
                .map(|file| self.storage.public_url(bucket, &file.name));
            let slot = match kind {
                MapKind::Normal => &mut urls.normal,
                MapKind::Roughness => &mut urls.roughness,
                MapKind::AmbientOcclusion => &mut urls.ambient_occlusion,
                MapKind::Displacement => &mut urls.displacement,
            };
            *slot = url;
        }
        urls
    }
}

/// The stem of a base image, or `None` for directories, non-images and
/// texture maps.
fn base_image_stem(file: &FileObject) -> Option<&str> {
    if file.is_directory() || naming::is_texture_map(&file.name) {
        return None;
    }
    naming::image_stem(&file.name)
}

fn new_synced_fabric(
    id: cushion_core::FabricId,
    name: String,
    texture_url: String,
    maps: MapUrls,
    synced_so_far: usize,
    now: DateTime<Utc>,
) -> Fabric {
    let order = i32::try_from(synced_so_far)
        .map_or(i32::MAX, |n| SYNC_ORDER_BASE.saturating_add(n));

    Fabric {
        id,
        description: format!("Premium Sunproof stof - {name}"),
        name,
        category: SUNPROOF_CATEGORY.to_string(),
        color: DEFAULT_COLOR.to_string(),
        texture_pattern: None,
        texture_url: Some(texture_url),
        normal_map_url: maps.normal,
        roughness_map_url: maps.roughness,
        ao_map_url: maps.ambient_occlusion,
        displacement_map_url: maps.displacement,
        price_per_meter: Decimal::from(DEFAULT_SYNC_PRICE),
        composition: DEFAULT_COMPOSITION.to_string(),
        water_resistant: true,
        uv_resistant: true,
        active: true,
        order,
        tags: DEFAULT_TAGS.iter().map(|t| (*t).to_string()).collect(),
        created_at: now,
        updated_at: now,
    }
}

/// Run one sync against the auto-selected bucket in the background.
///
/// Failures are logged; they never stop the server.
pub fn spawn_startup_sync(
    storage: Arc<dyn ObjectStorage>,
    kv: Arc<dyn KvStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match FabricSync::new(storage.as_ref(), kv.as_ref()).run(None).await {
            Ok(summary) => tracing::info!(
                bucket = %summary.bucket,
                count = summary.count,
                created = summary.created,
                "startup sync finished"
            ),
            Err(e) => tracing::warn!(error = %e, "startup sync failed"),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cushion_core::{FabricFilter, FabricPatch};

    use super::*;
    use crate::kv::MemoryKvStore;
    use crate::storage::MemoryStorage;

    const BUCKET: &str = "SUNPROOF SELECTIE";

    async fn storage_with(files: &[&str]) -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.add_bucket("avatars").await;
        for name in files {
            storage.add_file(BUCKET, name).await;
        }
        storage
    }

    #[tokio::test]
    async fn test_sync_creates_fabrics_and_links_maps() {
        let storage = storage_with(&[
            "Ocean Blue.png",
            "Ocean Blue_Normal.png",
            "Ocean Blue_roughness.jpg",
            "Sand & Stone #2.jpg",
            "readme.txt",
        ])
        .await;
        storage.add_folder(BUCKET, "archive").await;
        let kv = MemoryKvStore::new();

        let summary = FabricSync::new(&storage, &kv).run(None).await.unwrap();

        assert_eq!(summary.bucket, BUCKET);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.total_files_in_bucket, 6);
        assert_eq!(
            summary.processed_files,
            vec!["Ocean Blue.png".to_string(), "Sand & Stone #2.jpg".to_string()]
        );

        let repo = FabricRepository::new(&kv);
        let ocean = repo.get("sunproof-ocean-blue").await.unwrap();
        assert_eq!(ocean.name, "Ocean Blue");
        assert_eq!(ocean.order, 100);
        assert_eq!(ocean.description, "Premium Sunproof stof - Ocean Blue");
        assert!(ocean.normal_map_url.unwrap().ends_with("Ocean%20Blue_Normal.png"));
        assert!(ocean.roughness_map_url.is_some());
        assert!(ocean.ao_map_url.is_none());
        assert!(repo.find("sunproof-ocean-blue-normal").await.unwrap().is_none());

        let sand = repo.get("sunproof-sand-stone-2").await.unwrap();
        assert_eq!(sand.name, "Sand & Stone #2");
        assert_eq!(sand.order, 101);
        assert_eq!(sand.price_per_meter, Decimal::from(45));
        assert_eq!(sand.tags, vec!["sunproof", "premium", "outdoor"]);
    }

    #[tokio::test]
    async fn test_resync_preserves_user_edits() {
        let storage = storage_with(&["Ocean Blue.png", "Tweed.png"]).await;
        let kv = MemoryKvStore::new();
        let sync = FabricSync::new(&storage, &kv);
        sync.run(None).await.unwrap();

        let repo = FabricRepository::new(&kv);
        let patch = FabricPatch {
            price_per_meter: Some(Decimal::new(5995, 2)),
            active: Some(false),
            order: Some(5),
            ..FabricPatch::default()
        };
        repo.update("sunproof-tweed", patch).await.unwrap();
        let before = repo.list(&FabricFilter::default()).await.unwrap();

        let second = sync.run(None).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);

        let after = repo.list(&FabricFilter::default()).await.unwrap();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            let mut a = a.clone();
            a.updated_at = b.updated_at;
            assert_eq!(*b, a);
        }
        let tweed = repo.get("sunproof-tweed").await.unwrap();
        assert_eq!(tweed.price_per_meter, Decimal::new(5995, 2));
        assert!(!tweed.active);
    }

    #[tokio::test]
    async fn test_requested_bucket_wins_and_falls_back() {
        let storage = storage_with(&["Ocean.png"]).await;
        storage.add_file("textures", "Linen.png").await;
        let kv = MemoryKvStore::new();
        let sync = FabricSync::new(&storage, &kv);

        let summary = sync.run(Some("textures")).await.unwrap();
        assert_eq!(summary.bucket, "textures");

        let summary = sync.run(Some("does-not-exist")).await.unwrap();
        assert_eq!(summary.bucket, BUCKET);
    }

    #[tokio::test]
    async fn test_no_suitable_bucket() {
        let storage = MemoryStorage::new();
        storage.add_bucket("avatars").await;
        let kv = MemoryKvStore::new();

        let err = FabricSync::new(&storage, &kv)
            .run(Some("fabrics"))
            .await
            .unwrap_err();
        match err {
            SyncError::NoSuitableBucket {
                available,
                requested,
            } => {
                assert_eq!(available.len(), 1);
                assert_eq!(requested.as_deref(), Some("fabrics"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_bucket_and_listing_failures() {
        let storage = MemoryStorage::new();
        storage.add_bucket("sunproof").await;
        let kv = MemoryKvStore::new();
        let sync = FabricSync::new(&storage, &kv);

        assert!(matches!(sync.run(None).await, Err(SyncError::NoFiles { .. })));

        storage.fail_file_listing(true);
        assert!(matches!(
            sync.run(None).await,
            Err(SyncError::FileListing { .. })
        ));

        storage.fail_bucket_listing(true);
        assert!(matches!(
            sync.run(None).await,
            Err(SyncError::BucketListing(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_keeps_processed_fabrics() {
        let storage = storage_with(&["A.png", "B.png", "C.png"]).await;
        let kv = MemoryKvStore::new();
        kv.fail_writes_after(2);

        let result = FabricSync::new(&storage, &kv).run(None).await;
        assert!(matches!(result, Err(SyncError::Repository(_))));
        assert_eq!(FabricRepository::new(&kv).count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_pagination_reads_every_page() {
        let storage = MemoryStorage::new();
        for i in 0..(PAGE_SIZE + 5) {
            storage.add_file("sunproof", &format!("f{i:05}.png")).await;
        }
        let kv = MemoryKvStore::new();

        let summary = FabricSync::new(&storage, &kv).run(None).await.unwrap();
        assert_eq!(summary.total_files_in_bucket, PAGE_SIZE + 5);
        assert_eq!(summary.created, PAGE_SIZE + 5);
    }
}
