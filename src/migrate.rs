//! Checkpointed migration of sealed tracked-content records.
//!
//! One invocation performs a full pass: load the prior checkpoint,
//! snapshot the source key set, skip already-completed keys, repair and
//! write the rest to the destination, and persist the checkpoint. A
//! failing record never aborts the pass; it lands in the failed set for
//! the next run to retry. The driver is safe to re-run at any time:
//! destination writes are idempotent upserts and completed keys are
//! never reprocessed.

use crate::adapter::CacheAdapter;
use crate::checkpoint::CheckpointStore;
use crate::config::{BackendKind, MigrationConfig};
use crate::error::Result;
use crate::repair;
use crate::types::{TrackedContent, TrackingKey};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-record failure with the key and the reason, aggregated into the
/// failed set instead of being raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Checkpoint identity of the failed record.
    pub key: String,
    /// Why the record failed.
    pub reason: String,
}

impl RecordFailure {
    fn new(key: &TrackingKey, reason: impl Into<String>) -> Self {
        Self {
            key: key.id().to_string(),
            reason: reason.into(),
        }
    }
}

/// Outcome of processing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The record was repaired and written to the destination.
    Migrated,
    /// The record failed; the pass continues with the next key.
    Failed(RecordFailure),
}

/// Aggregate result of one migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Records written to the destination in this run.
    pub migrated: u64,

    /// Keys skipped because a prior run already completed them.
    pub skipped: u64,

    /// Failed keys with their reasons, exactly as persisted to
    /// `failed.out`.
    pub failed: BTreeMap<String, String>,

    /// Whether the run was a no-op (configuration short-circuit or
    /// re-entry rejection).
    pub noop: bool,
}

impl MigrationReport {
    fn noop() -> Self {
        Self {
            noop: true,
            ..Default::default()
        }
    }
}

/// Clears the running flag when the pass ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates one checkpointed pass from the source cache to the
/// durable destination.
///
/// All collaborators are passed in at construction; the driver holds no
/// ambient state beyond the single-flight guard.
pub struct MigrationDriver<S, D> {
    source: Arc<S>,
    destination: Arc<D>,
    checkpoint: CheckpointStore,
    config: MigrationConfig,
    running: AtomicBool,
}

impl<S, D> MigrationDriver<S, D>
where
    S: CacheAdapter<Key = TrackingKey, Value = TrackedContent>,
    D: CacheAdapter<Key = TrackingKey, Value = TrackedContent>,
{
    /// Create a driver over the given source, destination, and
    /// checkpoint store.
    pub fn new(
        source: Arc<S>,
        destination: Arc<D>,
        checkpoint: CheckpointStore,
        config: MigrationConfig,
    ) -> Self {
        Self {
            source,
            destination,
            checkpoint,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Run one full migration pass.
    ///
    /// Returns a no-op report when the destination is not the durable
    /// backend or when another pass is already running. Fails only on
    /// stage-fatal conditions (unreadable checkpoint, snapshot failure,
    /// checkpoint persistence failure); per-record failures are
    /// collected into the report and `failed.out`.
    pub async fn run(&self) -> Result<MigrationReport> {
        if self.config.durable_backend != BackendKind::ColumnStore {
            info!(
                backend = %self.config.durable_backend,
                "destination backend is not the durable store, skipping migration"
            );
            return Ok(MigrationReport::noop());
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("migration already in progress");
            return Ok(MigrationReport::noop());
        }
        let _guard = RunningGuard(&self.running);

        // An unreadable checkpoint aborts the whole run before any record
        // is processed: without it every already-migrated record would be
        // reprocessed.
        let prev_completed = match self.checkpoint.load_completed() {
            Ok(prev) => prev,
            Err(e) => {
                error!(error = %e, "cannot read previous checkpoint, aborting migration");
                return Err(e.into());
            }
        };

        info!("tracked-content migration start");

        let mut report = MigrationReport::default();
        let mut completed = BTreeSet::new();

        let pass = self
            .run_pass(&prev_completed, &mut completed, &mut report)
            .await;

        // Persist whatever was accumulated, even if the pass aborted
        // mid-iteration.
        let persisted = self.persist(&completed, &report.failed);

        pass?;
        persisted?;
        Ok(report)
    }

    async fn run_pass(
        &self,
        prev_completed: &HashSet<String>,
        completed: &mut BTreeSet<String>,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let mut keys = Vec::new();
        self.source
            .for_each(&mut |key: &TrackingKey, _| keys.push(key.clone()))
            .await?;
        info!(total = keys.len(), "snapshotted source key set");

        for key in keys {
            if prev_completed.contains(key.id()) {
                report.skipped += 1;
                continue;
            }

            match self.migrate_one(&key).await {
                RecordOutcome::Migrated => {
                    report.migrated += 1;
                    completed.insert(key.id().to_string());
                    if report.migrated % self.config.progress_interval.max(1) == 0 {
                        info!(migrated = report.migrated, "migration progress");
                    }
                }
                RecordOutcome::Failed(failure) => {
                    report.failed.insert(failure.key, failure.reason);
                }
            }
        }

        info!(
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed.len(),
            "tracked-content migration done"
        );
        Ok(())
    }

    /// Process one key in isolation. Never propagates an error.
    async fn migrate_one(&self, key: &TrackingKey) -> RecordOutcome {
        let mut record = match self.source.get(key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(key = %key, "tracked content missing");
                return RecordOutcome::Failed(RecordFailure::new(key, "content missing"));
            }
            Err(e) => {
                error!(key = %key, error = %e, "failed to read tracked content");
                return RecordOutcome::Failed(RecordFailure::new(key, e.to_string()));
            }
        };

        let amended = repair::amend_tracking_key(&mut record);
        if amended > 0 {
            debug!(key = %key, amended, "backfilled entry tracking keys");
        }

        if let Err(e) = self.destination.put(key.clone(), record).await {
            error!(key = %key, error = %e, "failed to write record to destination");
            return RecordOutcome::Failed(RecordFailure::new(key, e.to_string()));
        }

        RecordOutcome::Migrated
    }

    /// Persist both checkpoint files, attempting each even if the other
    /// fails.
    fn persist(
        &self,
        completed: &BTreeSet<String>,
        failed: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut first_err = None;

        if let Err(e) = self.checkpoint.append_completed(completed) {
            error!(error = %e, "failed to append completed checkpoint");
            first_err = Some(e.into());
        }
        if let Err(e) = self.checkpoint.overwrite_failed(failed) {
            error!(error = %e, "failed to overwrite failed checkpoint");
            first_err.get_or_insert(e.into());
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
