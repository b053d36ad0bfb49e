//! Cache adapter boundary.
//!
//! The migration and transfer engines never know backend internals; they
//! talk to any backend through [`CacheAdapter`]. Two concrete shims ship
//! with the crate, selected at construction by explicit configuration:
//!
//! - [`ReplicatedCacheAdapter`] stands in for the in-memory replicated
//!   cache that holds freshly tracked records.
//! - [`ColumnStoreAdapter`] stands in for the durable column store that
//!   sealed records migrate into.

mod column;
mod memory;

pub use column::ColumnStoreAdapter;
pub use memory::ReplicatedCacheAdapter;

use crate::error::Result;
use async_trait::async_trait;

/// Capability interface implemented once per cache backend.
///
/// `remove` exists for the operator dedup-and-clean load workflow; plain
/// loads never call it. Adapters must reject use before `start()` and
/// after `stop()`.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Key type stored by the backend.
    type Key: Send + Sync;

    /// Value type stored by the backend.
    type Value: Send + Sync;

    /// Acquire the cache subsystem.
    async fn start(&self) -> Result<()>;

    /// Release the cache subsystem.
    async fn stop(&self) -> Result<()>;

    /// Fetch the value for a key, if present.
    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>>;

    /// Upsert a key-value pair. Idempotent per key.
    async fn put(&self, key: Self::Key, value: Self::Value) -> Result<()>;

    /// Remove a key, if present.
    async fn remove(&self, key: &Self::Key) -> Result<()>;

    /// Visit every entry in an indeterminate but stable-for-one-pass
    /// order.
    async fn for_each(
        &self,
        visitor: &mut (dyn for<'a, 'b> FnMut(&'a Self::Key, &'b Self::Value) + Send),
    ) -> Result<()>;

    /// Number of entries in the cache.
    async fn size(&self) -> Result<usize>;
}
