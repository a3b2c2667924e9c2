//! Fabric repository.
//!
//! Fabrics are stored as camelCase JSON documents under `fabric:<id>`. Listing
//! is a prefix scan followed by in-process filtering and sorting.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use cushion_core::{
    Fabric, FabricCategory, FabricFilter, FabricId, FabricPatch, NewFabric, SUNPROOF_CATEGORY,
};

use super::{RepositoryError, decode, encode};
use crate::kv::KvStore;

const FABRIC_PREFIX: &str = "fabric:";

fn fabric_key(id: &str) -> String {
    format!("{FABRIC_PREFIX}{id}")
}

fn raw_str<'v>(document: &'v Value, field: &str) -> Option<&'v str> {
    document.get(field).and_then(Value::as_str)
}

/// Outcome of removing non-sunproof fabrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted: usize,
    pub remaining: usize,
    pub deleted_ids: Vec<FabricId>,
}

/// Repository for fabric records.
pub struct FabricRepository<'a> {
    kv: &'a dyn KvStore,
}

impl<'a> FabricRepository<'a> {
    /// Create a new fabric repository.
    #[must_use]
    pub const fn new(kv: &'a dyn KvStore) -> Self {
        Self { kv }
    }

    /// Every decodable fabric, in key order. Undecodable documents are
    /// skipped with a warning so one bad record cannot break listing.
    async fn all(&self) -> Result<Vec<Fabric>, RepositoryError> {
        Ok(self
            .kv
            .get_by_prefix(FABRIC_PREFIX)
            .await?
            .into_iter()
            .filter_map(|value| {
                let id = raw_str(&value, "id").map(str::to_owned);
                serde_json::from_value(value)
                    .inspect_err(|e| {
                        tracing::warn!(id = id.as_deref(), error = %e, "skipping undecodable fabric");
                    })
                    .ok()
            })
            .collect())
    }

    /// List fabrics matching `filter`, sorted by `order` then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the scan fails.
    /// Undecodable records are left out.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: &FabricFilter) -> Result<Vec<Fabric>, RepositoryError> {
        let mut fabrics: Vec<Fabric> = self
            .all()
            .await?
            .into_iter()
            .filter(|f| filter.matches(f))
            .collect();
        Fabric::sort_catalog(&mut fabrics);

        tracing::debug!(count = fabrics.len(), "listed fabrics");
        Ok(fabrics)
    }

    /// Look up a fabric, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` or `RepositoryError::DataCorruption`.
    pub async fn find(&self, id: &str) -> Result<Option<Fabric>, RepositoryError> {
        let key = fabric_key(id);
        self.kv
            .get(&key)
            .await?
            .map(|value| decode(&key, value))
            .transpose()
    }

    /// Get a fabric by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no fabric has this id.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Fabric, RepositoryError> {
        self.find(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Create a fabric from an admin request, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` if id, name or category is missing.
    /// Returns `RepositoryError::Conflict` if the id is taken.
    #[tracing::instrument(skip(self, input), fields(id = input.id.as_deref()))]
    pub async fn create(&self, input: NewFabric) -> Result<Fabric, RepositoryError> {
        let fabric = input
            .into_fabric(Utc::now())
            .map_err(|e| RepositoryError::Validation(e.to_string()))?;

        if self.find(fabric.id.as_str()).await?.is_some() {
            return Err(RepositoryError::Conflict(
                "Fabric with this ID already exists".to_string(),
            ));
        }

        self.upsert(&fabric).await?;
        tracing::info!(id = %fabric.id, "fabric created");
        Ok(fabric)
    }

    /// Merge `patch` into an existing fabric.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no fabric has this id.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: FabricPatch) -> Result<Fabric, RepositoryError> {
        let mut fabric = self.get(id).await?;
        fabric.apply(patch, Utc::now());
        self.upsert(&fabric).await?;
        tracing::info!(id, "fabric updated");
        Ok(fabric)
    }

    /// Delete a fabric.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no fabric has this id.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        if self.find(id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.kv.delete(&fabric_key(id)).await?;
        tracing::info!(id, "fabric deleted");
        Ok(())
    }

    /// Write a fabric unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn upsert(&self, fabric: &Fabric) -> Result<(), RepositoryError> {
        let value = encode(fabric)?;
        self.kv.set(&fabric_key(fabric.id.as_str()), value).await?;
        Ok(())
    }

    /// Distinct categories with their active-fabric counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the scan fails.
    #[tracing::instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<FabricCategory>, RepositoryError> {
        Ok(FabricCategory::summarize(&self.all().await?))
    }

    /// Delete every fabric outside the sunproof category in one call.
    ///
    /// Works on the raw documents, so records that no longer decode are
    /// removed too when their `category` is not sunproof. Documents without
    /// an `id` cannot be addressed and stay in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the scan or delete fails.
    #[tracing::instrument(skip(self))]
    pub async fn cleanup_non_sunproof(&self) -> Result<CleanupReport, RepositoryError> {
        let documents = self.kv.get_by_prefix(FABRIC_PREFIX).await?;
        let total = documents.len();

        let mut deleted_ids = Vec::new();
        for document in &documents {
            if raw_str(document, "category") == Some(SUNPROOF_CATEGORY) {
                continue;
            }
            match raw_str(document, "id") {
                Some(id) => deleted_ids.push(FabricId::new(id)),
                None => tracing::warn!("fabric document without id left in place"),
            }
        }

        if !deleted_ids.is_empty() {
            let keys: Vec<String> = deleted_ids.iter().map(|id| fabric_key(id.as_str())).collect();
            self.kv.mdel(&keys).await?;
            tracing::info!(deleted = keys.len(), "removed non-sunproof fabrics");
        }

        Ok(CleanupReport {
            deleted: deleted_ids.len(),
            remaining: total - deleted_ids.len(),
            deleted_ids,
        })
    }

    /// Number of stored fabrics.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the scan fails.
    pub async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.kv.get_by_prefix(FABRIC_PREFIX).await?.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::kv::MemoryKvStore;

    fn new_fabric(id: &str, name: &str, category: &str, order: i32) -> NewFabric {
        NewFabric {
            order: Some(order),
            ..NewFabric::new(id, name, category)
        }
    }

    async fn seeded() -> MemoryKvStore {
        let kv = MemoryKvStore::new();
        let repo = FabricRepository::new(&kv);
        repo.create(new_fabric("c", "Canvas", "outdoor", 2)).await.unwrap();
        repo.create(new_fabric("b", "bamboo", "sunproof", 1)).await.unwrap();
        repo.create(new_fabric("a", "Acryl", "sunproof", 1)).await.unwrap();
        repo.create(NewFabric {
            active: Some(false),
            ..new_fabric("d", "Denim", "premium", 3)
        })
        .await
        .unwrap();
        kv
    }

    #[tokio::test]
    async fn test_list_sorts_by_order_then_name() {
        let kv = seeded().await;
        let fabrics = FabricRepository::new(&kv)
            .list(&FabricFilter::default())
            .await
            .unwrap();
        let ids: Vec<_> = fabrics.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_list_applies_filters() {
        let kv = seeded().await;
        let repo = FabricRepository::new(&kv);

        let sunproof = repo
            .list(&FabricFilter::from_query(Some("sunproof"), None))
            .await
            .unwrap();
        assert!(sunproof.iter().all(|f| f.category == "sunproof"));
        assert_eq!(sunproof.len(), 2);

        let inactive = repo
            .list(&FabricFilter::from_query(None, Some("false")))
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id.as_str(), "d");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_and_missing_fields() {
        let kv = seeded().await;
        let repo = FabricRepository::new(&kv);

        assert!(matches!(
            repo.create(new_fabric("a", "Again", "sunproof", 1)).await,
            Err(RepositoryError::Conflict(_))
        ));

        let err = repo
            .create(NewFabric {
                id: Some("x".into()),
                ..NewFabric::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: id, name, category");
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_id() {
        let kv = seeded().await;
        let repo = FabricRepository::new(&kv);
        let before = repo.get("a").await.unwrap();

        let patch: FabricPatch =
            serde_json::from_value(json!({"id": "hijack", "color": "#112233"})).unwrap();
        let after = repo.update("a", patch).await.unwrap();

        assert_eq!(after.id.as_str(), "a");
        assert_eq!(after.color, "#112233");
        assert_eq!(after.name, before.name);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
        assert!(repo.find("hijack").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_fabric_is_not_found() {
        let kv = MemoryKvStore::new();
        let repo = FabricRepository::new(&kv);
        assert!(matches!(repo.get("nope").await, Err(RepositoryError::NotFound)));
        assert!(matches!(
            repo.update("nope", FabricPatch::default()).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(repo.delete("nope").await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_categories_count_active_only() {
        let kv = seeded().await;
        let categories = FabricRepository::new(&kv).categories().await.unwrap();
        let summary: Vec<_> = categories
            .iter()
            .map(|c| (c.name.as_str(), c.count))
            .collect();
        assert_eq!(summary, vec![("outdoor", 1), ("premium", 0), ("sunproof", 2)]);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_sunproof() {
        let kv = seeded().await;
        let repo = FabricRepository::new(&kv);

        let report = repo.cleanup_non_sunproof().await.unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.remaining, 2);
        assert_eq!(report.deleted_ids, vec![FabricId::new("c"), FabricId::new("d")]);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported_on_direct_lookup() {
        let kv = MemoryKvStore::new();
        kv.set("fabric:broken", json!({"id": "broken"})).await.unwrap();
        let result = FabricRepository::new(&kv).get("broken").await;
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped_by_scans() {
        let kv = seeded().await;
        kv.set("fabric:broken", json!({"id": "broken", "category": "outdoor"}))
            .await
            .unwrap();
        let repo = FabricRepository::new(&kv);

        let ids: Vec<_> = repo
            .list(&FabricFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids.len(), 4);
        assert!(!ids.contains(&FabricId::new("broken")));

        let categories = repo.categories().await.unwrap();
        assert_eq!(categories.len(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_removes_undecodable_non_sunproof_records() {
        let kv = seeded().await;
        kv.set("fabric:broken", json!({"id": "broken", "category": "outdoor"}))
            .await
            .unwrap();
        kv.set("fabric:half", json!({"id": "half", "category": "sunproof"}))
            .await
            .unwrap();
        kv.set("fabric:anonymous", json!({"name": "no id"})).await.unwrap();
        let repo = FabricRepository::new(&kv);

        let report = repo.cleanup_non_sunproof().await.unwrap();
        assert_eq!(
            report.deleted_ids,
            vec![
                FabricId::new("broken"),
                FabricId::new("c"),
                FabricId::new("d")
            ]
        );
        assert_eq!(report.remaining, 4);
        assert!(kv.get("fabric:broken").await.unwrap().is_none());
        assert!(kv.get("fabric:half").await.unwrap().is_some());
        assert!(kv.get("fabric:anonymous").await.unwrap().is_some());
    }
}
