//! Dump, load, and export passes between a cache and a file.
//!
//! The sibling of the migration driver: the same per-record isolation
//! and codec logic, but with a cache on one side and a file on the
//! other. All three modes wrap cache access in a scoped acquisition:
//! the subsystem is started before the pass and stopped afterwards,
//! even when the pass fails.
//!
//! Error semantics differ between directions. A dump treats the first
//! write failure as stage-fatal (no further writes are issued once the
//! shared error slot is set); a load isolates per-record read failures
//! and carries on, reporting them in the [`TransferReport`].

use crate::adapter::CacheAdapter;
use crate::codec::{
    BinaryDumpReader, BinaryDumpWriter, CodecFormat, DuplicatePolicy, JsonLinesReader,
    JsonLinesWriter,
};
use crate::config::TransferConfig;
use crate::error::{CodecError, Error, Result};
use crate::types::{TrackedContent, TrackingKey};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Aggregate result of one dump, load, or export pass.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    /// Records written to the dump file.
    pub written: u64,

    /// Records newly inserted into the destination cache.
    pub loaded: u64,

    /// Records whose key already existed in the destination.
    pub existing: u64,

    /// Sealed records handed to the archiver.
    pub exported: u64,

    /// Per-record errors encountered during the pass.
    pub errors: Vec<String>,
}

/// Content-specific archival routine for sealed-record export.
///
/// The crate only defines the boundary; production archivers (zipped
/// tracking reports and the like) live with the content subsystem.
#[async_trait]
pub trait ReportArchiver: Send + Sync {
    /// Archive the given sealed records to the target path.
    async fn archive(
        &self,
        path: &Path,
        records: Vec<(TrackingKey, TrackedContent)>,
    ) -> Result<()>;
}

/// Minimal archiver writing one JSON summary line per sealed record.
pub struct JsonReportArchiver;

#[async_trait]
impl ReportArchiver for JsonReportArchiver {
    async fn archive(
        &self,
        path: &Path,
        records: Vec<(TrackingKey, TrackedContent)>,
    ) -> Result<()> {
        let file =
            File::create(path).map_err(|e| Error::Archive(format!("{}: {e}", path.display())))?;
        let mut writer = BufWriter::new(file);

        for (key, record) in &records {
            let line = serde_json::json!({
                "key": key,
                "uploads": record.uploads.len(),
                "downloads": record.downloads.len(),
            });
            writeln!(writer, "{line}")
                .map_err(|e| Error::Archive(format!("{}: {e}", path.display())))?;
        }

        writer
            .flush()
            .map_err(|e| Error::Archive(format!("{}: {e}", path.display())))
    }
}

/// Runs dump, load, and export passes over one cache adapter.
pub struct TransferEngine<A> {
    adapter: Arc<A>,
    config: TransferConfig,
}

impl<A> TransferEngine<A>
where
    A: CacheAdapter<Key = TrackingKey, Value = TrackedContent>,
{
    /// Create an engine over the given adapter.
    pub fn new(adapter: Arc<A>, config: TransferConfig) -> Self {
        Self { adapter, config }
    }

    /// Dump the cache to the configured data file.
    pub async fn dump(&self) -> Result<TransferReport> {
        self.adapter.start().await?;
        let result = self.dump_inner().await;
        self.release().await;
        result
    }

    /// Load the configured data file into the cache.
    pub async fn load(&self) -> Result<TransferReport> {
        self.adapter.start().await?;
        let result = self.load_inner().await;
        self.release().await;
        result
    }

    /// Export the sealed records to the configured file via the given
    /// archiver.
    pub async fn export(&self, archiver: &dyn ReportArchiver) -> Result<TransferReport> {
        self.adapter.start().await?;
        let result = self.export_inner(archiver).await;
        self.release().await;
        result
    }

    /// Stop the cache subsystem, logging rather than masking a failure
    /// so the pass result survives.
    async fn release(&self) {
        if let Err(e) = self.adapter.stop().await {
            error!(error = %e, "failed to stop cache subsystem");
        }
    }

    async fn dump_inner(&self) -> Result<TransferReport> {
        let path = &self.config.data_file;
        let size = self.adapter.size().await?;
        info!(
            records = size,
            format = %self.config.format,
            file = %path.display(),
            "dumping cache"
        );

        let written = match self.config.format {
            CodecFormat::Binary => {
                let mut writer = BinaryDumpWriter::create(path, size as u64)?;
                self.write_all_entries(|k, v| writer.write(k, v)).await?;
                let written = writer.written();
                writer.finish()?;
                written
            }
            CodecFormat::JsonLines => {
                let mut writer = JsonLinesWriter::create(path)?;
                self.write_all_entries(|k, v| writer.write(k, v)).await?;
                let written = writer.written();
                writer.finish()?;
                written
            }
        };

        info!(written, "dump complete");
        Ok(TransferReport {
            written,
            ..Default::default()
        })
    }

    /// Iterate the cache into the given write function, stopping at the
    /// first failure. The error slot is checked before every write so no
    /// entry is written after a failure.
    async fn write_all_entries(
        &self,
        mut write: impl FnMut(&TrackingKey, &TrackedContent) -> std::result::Result<(), CodecError>
            + Send,
    ) -> Result<()> {
        let mut first_error: Option<CodecError> = None;
        let mut visitor = |key: &TrackingKey, value: &TrackedContent| {
            if first_error.is_some() {
                return;
            }
            if let Err(e) = write(key, value) {
                error!(key = %key, error = %e, "failed to write dump entry");
                first_error = Some(e);
            }
        };
        self.adapter.for_each(&mut visitor).await?;
        drop(visitor);

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn load_inner(&self) -> Result<TransferReport> {
        let path = &self.config.data_file;
        info!(
            format = %self.config.format,
            file = %path.display(),
            "loading dump file"
        );

        let mut report = TransferReport::default();
        match self.config.format {
            CodecFormat::Binary => {
                let mut reader: BinaryDumpReader<TrackingKey, TrackedContent> =
                    BinaryDumpReader::open(path)?;
                let declared = reader.record_count();

                // Pairs physically present in the stream, whether or not
                // they decoded. A stream-fatal failure is not a pair.
                let mut present = 0u64;
                while let Some(pair) = reader.next_pair() {
                    match pair {
                        Ok((key, value)) => {
                            present += 1;
                            self.adapter.put(key, value).await?;
                            report.loaded += 1;
                        }
                        Err(e) => {
                            if e.is_per_record() {
                                present += 1;
                            }
                            error!(error = %e, "failed to read dump entry");
                            report.errors.push(e.to_string());
                        }
                    }
                }

                if present < declared {
                    let e = CodecError::CountMismatch {
                        declared,
                        actual: present,
                    };
                    error!(error = %e, "dump file is corrupt");
                    report.errors.push(e.to_string());
                }
            }
            CodecFormat::JsonLines => {
                let mut reader: JsonLinesReader<TrackingKey, TrackedContent> =
                    JsonLinesReader::open(path)?;

                while let Some(pair) = reader.next_pair() {
                    match pair {
                        Ok((key, value)) => {
                            if self.adapter.get(&key).await?.is_some() {
                                info!(key = %key, "key already present in destination");
                                report.existing += 1;
                                if self.config.duplicate_policy == DuplicatePolicy::RemoveExisting {
                                    self.adapter.remove(&key).await?;
                                }
                            } else {
                                self.adapter.put(key, value).await?;
                                report.loaded += 1;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "failed to read dump entry");
                            report.errors.push(e.to_string());
                        }
                    }
                }
            }
        }

        info!(
            loaded = report.loaded,
            existing = report.existing,
            errors = report.errors.len(),
            size = self.adapter.size().await?,
            "load complete"
        );
        Ok(report)
    }

    async fn export_inner(&self, archiver: &dyn ReportArchiver) -> Result<TransferReport> {
        let mut sealed = Vec::new();
        self.adapter
            .for_each(&mut |key: &TrackingKey, _| sealed.push(key.clone()))
            .await?;
        info!(sealed = sealed.len(), "collected sealed tracking keys");

        let mut report = TransferReport::default();
        let mut records = Vec::with_capacity(sealed.len());
        for key in sealed {
            match self.adapter.get(&key).await {
                Ok(Some(record)) => records.push((key, record)),
                Ok(None) => {
                    warn!(key = %key, "sealed record missing");
                    report.errors.push(format!("{key}: content missing"));
                }
                Err(e) => {
                    error!(key = %key, error = %e, "failed to read sealed record");
                    report.errors.push(format!("{key}: {e}"));
                }
            }
        }

        let path = &self.config.data_file;
        if path.exists() {
            fs::remove_file(path)
                .map_err(|e| Error::Archive(format!("{}: {e}", path.display())))?;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Archive(format!("{}: {e}", parent.display())))?;
        }

        report.exported = records.len() as u64;
        archiver.archive(path, records).await?;

        info!(exported = report.exported, file = %path.display(), "export complete");
        Ok(report)
    }
}
