//! In-memory backend for the key-value store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{KvError, KvResult, KvStore};

const UNLIMITED: usize = usize::MAX;

/// Ordered in-memory key-value store.
///
/// Used by tests and as the fallback when no database is configured. Data is
/// lost when the process exits.
#[derive(Debug)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, Value>>,
    /// Remaining writes before the store starts failing; `UNLIMITED` disables.
    write_budget: AtomicUsize,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            write_budget: AtomicUsize::new(UNLIMITED),
        }
    }

    /// Allow `writes` more mutating calls, then fail every write with
    /// [`KvError::Unavailable`]. Reads keep working.
    pub fn fail_writes_after(&self, writes: usize) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn take_write(&self) -> KvResult<()> {
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| match remaining {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .map(|_| ())
            .map_err(|_| KvError::Unavailable("write limit reached".to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> KvResult<()> {
        self.take_write()?;
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        self.take_write()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn get_by_prefix(&self, prefix: &str) -> KvResult<Vec<Value>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| value.clone())
            .collect())
    }

    async fn mdel(&self, keys: &[String]) -> KvResult<()> {
        self.take_write()?;
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.get("fabric:nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let kv = MemoryKvStore::new();
        kv.set("k", json!(1)).await.unwrap();
        kv.set("k", json!(2)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(kv.len().await, 1);
    }

    #[tokio::test]
    async fn test_prefix_scan_is_ordered_and_bounded() {
        let kv = MemoryKvStore::new();
        kv.set("fabric:b", json!("b")).await.unwrap();
        kv.set("fabric:a", json!("a")).await.unwrap();
        kv.set("fabrics", json!("not a fabric")).await.unwrap();
        kv.set("user:1:role", json!("admin")).await.unwrap();

        let values = kv.get_by_prefix("fabric:").await.unwrap();
        assert_eq!(values, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_delete_and_mdel_ignore_missing_keys() {
        let kv = MemoryKvStore::new();
        kv.set("a", json!(1)).await.unwrap();
        kv.set("b", json!(2)).await.unwrap();

        kv.delete("missing").await.unwrap();
        kv.mdel(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(kv.get("a").await.unwrap(), None);
        assert_eq!(kv.get("b").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_write_budget() {
        let kv = MemoryKvStore::new();
        kv.fail_writes_after(1);
        kv.set("a", json!(1)).await.unwrap();
        assert!(matches!(
            kv.set("b", json!(2)).await,
            Err(KvError::Unavailable(_))
        ));
        // Reads are unaffected.
        assert_eq!(kv.get("a").await.unwrap(), Some(json!(1)));
    }
}
