//! Durable column-store shim.

use crate::adapter::CacheAdapter;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Stand-in for the durable column store that sealed records migrate
/// into.
///
/// Writes are idempotent upserts keyed on the record identifier, so a
/// re-run that revisits an already-migrated key is wasted work but never
/// harmful. The upsert counter lets callers observe exactly how many
/// destination writes a pass issued.
pub struct ColumnStoreAdapter<K, V> {
    name: String,
    rows: RwLock<HashMap<K, V>>,
    upserts: AtomicU64,
    started: AtomicBool,
}

impl<K, V> ColumnStoreAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Create an empty store with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(HashMap::new()),
            upserts: AtomicU64::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// The configured store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of upserts issued since construction.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::Adapter(format!("store {} is not started", self.name)))
        }
    }
}

#[async_trait]
impl<K, V> CacheAdapter for ColumnStoreAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    type Key = K;
    type Value = V;

    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        debug!(store = %self.name, "column store started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::Release);
        debug!(store = %self.name, "column store stopped");
        Ok(())
    }

    async fn get(&self, key: &K) -> Result<Option<V>> {
        self.ensure_started()?;
        Ok(self.rows.read().get(key).cloned())
    }

    async fn put(&self, key: K, value: V) -> Result<()> {
        self.ensure_started()?;
        self.upserts.fetch_add(1, Ordering::Relaxed);
        self.rows.write().insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<()> {
        self.ensure_started()?;
        self.rows.write().remove(key);
        Ok(())
    }

    async fn for_each(&self, visitor: &mut (dyn for<'a, 'b> FnMut(&'a K, &'b V) + Send)) -> Result<()> {
        self.ensure_started()?;
        let rows = self.rows.read();
        for (key, value) in rows.iter() {
            visitor(key, value);
        }
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        self.ensure_started()?;
        Ok(self.rows.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_counter_tracks_writes() {
        let store = ColumnStoreAdapter::new("folo-durable");
        store.start().await.unwrap();

        store.put("k1".to_string(), 1u32).await.unwrap();
        store.put("k1".to_string(), 2u32).await.unwrap();

        // Re-writing the same key is an upsert, not a growth.
        assert_eq!(store.upsert_count(), 2);
        assert_eq!(store.size().await.unwrap(), 1);
        assert_eq!(store.get(&"k1".to_string()).await.unwrap(), Some(2));
    }
}
