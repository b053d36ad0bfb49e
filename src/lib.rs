//! Caravel is a checkpointed migration and dump/load engine for
//! tracked-content audit records.
//!
//! An artifact repository that proxies and hosts build artifacts keeps
//! an audit record per build: every upload and download observed under
//! that build's tracking key. Caravel moves those records between a
//! legacy in-memory replicated cache and a durable column store, and
//! between caches and portable dump files.
//!
//! # Architecture
//!
//! - [`migrate::MigrationDriver`] runs the one-way, resumable cache to
//!   column-store migration. Progress is checkpointed to flat files so
//!   an interrupted run picks up where it left off.
//! - [`transfer::TransferEngine`] runs dump, load, and export passes
//!   between a cache and a file, in either a compressed binary format
//!   or line-delimited JSON.
//! - [`adapter::CacheAdapter`] is the seam both drivers operate
//!   through; production deployments plug their real stores in behind
//!   it.
//! - [`repair::amend_tracking_key`] backfills the denormalized
//!   tracking key on legacy entries as records pass through.
//!
//! # Example
//!
//! ```no_run
//! use caravel::adapter::{CacheAdapter, ColumnStoreAdapter, ReplicatedCacheAdapter};
//! use caravel::checkpoint::CheckpointStore;
//! use caravel::config::{BackendKind, MigrationConfig};
//! use caravel::migrate::MigrationDriver;
//! use caravel::types::{TrackedContent, TrackingKey};
//! use std::sync::Arc;
//!
//! # async fn run() -> caravel::error::Result<()> {
//! let source = Arc::new(ReplicatedCacheAdapter::<TrackingKey, TrackedContent>::new("folo"));
//! let destination = Arc::new(ColumnStoreAdapter::new("folo-durable"));
//!
//! let config = MigrationConfig::new("./data").with_durable_backend(BackendKind::ColumnStore);
//! let driver = MigrationDriver::new(source, destination, CheckpointStore::new("./data"), config);
//!
//! let report = driver.run().await?;
//! println!("migrated {} records, {} failed", report.migrated, report.failed.len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod error;
pub mod migrate;
pub mod repair;
pub mod transfer;
pub mod types;

pub use adapter::{CacheAdapter, ColumnStoreAdapter, ReplicatedCacheAdapter};
pub use checkpoint::CheckpointStore;
pub use codec::{CodecFormat, DuplicatePolicy};
pub use config::{BackendKind, MigrationConfig, ToolConfig, TransferConfig};
pub use error::{CheckpointError, CodecError, Error, Result};
pub use migrate::{MigrationDriver, MigrationReport};
pub use transfer::{ReportArchiver, TransferEngine, TransferReport};
pub use types::{TrackedContent, TrackedContentEntry, TrackingKey};
