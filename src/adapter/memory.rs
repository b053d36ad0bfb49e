//! In-memory replicated-cache shim.

use crate::adapter::CacheAdapter;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Stand-in for the replicated key-value cache that accumulates tracked
/// records.
///
/// Backed by a plain map behind a lock; sufficient for tests, tooling,
/// and as the source side of a migration pass.
pub struct ReplicatedCacheAdapter<K, V> {
    name: String,
    entries: RwLock<HashMap<K, V>>,
    started: AtomicBool,
}

impl<K, V> ReplicatedCacheAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Create an empty cache with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    /// The configured cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert an entry directly, bypassing the started check.
    ///
    /// Test and fixture seeding only.
    pub fn seed(&self, key: K, value: V) {
        self.entries.write().insert(key, value);
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::Adapter(format!("cache {} is not started", self.name)))
        }
    }
}

#[async_trait]
impl<K, V> CacheAdapter for ReplicatedCacheAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    type Key = K;
    type Value = V;

    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        debug!(cache = %self.name, "replicated cache started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::Release);
        debug!(cache = %self.name, "replicated cache stopped");
        Ok(())
    }

    async fn get(&self, key: &K) -> Result<Option<V>> {
        self.ensure_started()?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: K, value: V) -> Result<()> {
        self.ensure_started()?;
        self.entries.write().insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<()> {
        self.ensure_started()?;
        self.entries.write().remove(key);
        Ok(())
    }

    async fn for_each(&self, visitor: &mut (dyn for<'a, 'b> FnMut(&'a K, &'b V) + Send)) -> Result<()> {
        self.ensure_started()?;
        let entries = self.entries.read();
        for (key, value) in entries.iter() {
            visitor(key, value);
        }
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        self.ensure_started()?;
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_use_before_start() {
        let cache = ReplicatedCacheAdapter::<String, String>::new("folo");

        assert!(cache.get(&"k".to_string()).await.is_err());
        cache.start().await.unwrap();
        assert!(cache.get(&"k".to_string()).await.unwrap().is_none());

        cache.stop().await.unwrap();
        assert!(cache.size().await.is_err());
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let cache = ReplicatedCacheAdapter::new("folo");
        cache.start().await.unwrap();

        cache.put("k1".to_string(), 1u32).await.unwrap();
        cache.put("k2".to_string(), 2u32).await.unwrap();
        assert_eq!(cache.size().await.unwrap(), 2);
        assert_eq!(cache.get(&"k1".to_string()).await.unwrap(), Some(1));

        cache.remove(&"k1".to_string()).await.unwrap();
        assert_eq!(cache.get(&"k1".to_string()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_for_each_visits_all_entries() {
        let cache = ReplicatedCacheAdapter::new("folo");
        cache.start().await.unwrap();

        for i in 0..5u32 {
            cache.put(format!("k{i}"), i).await.unwrap();
        }

        let mut seen = Vec::new();
        cache
            .for_each(&mut |k: &String, v: &u32| seen.push((k.clone(), *v)))
            .await
            .unwrap();

        seen.sort();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], ("k0".to_string(), 0));
    }
}
