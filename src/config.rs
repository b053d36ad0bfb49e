//! Configuration types for the migration driver and transfer engine.

use crate::codec::{CodecFormat, DuplicatePolicy};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Which backend family a cache handle points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// In-memory replicated cache (the legacy record store).
    #[default]
    ReplicatedCache,
    /// Durable column store (the migration destination).
    ColumnStore,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::ReplicatedCache => write!(f, "replicated-cache"),
            BackendKind::ColumnStore => write!(f, "column-store"),
        }
    }
}

/// Configuration for one migration driver.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory holding the checkpoint files.
    pub data_dir: PathBuf,

    /// Backend the destination handle is configured as. A run is a
    /// no-op success unless this is [`BackendKind::ColumnStore`].
    pub durable_backend: BackendKind,

    /// Log a progress line every this many migrated records.
    pub progress_interval: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            durable_backend: BackendKind::default(),
            progress_interval: 10,
        }
    }
}

impl MigrationConfig {
    /// Create a configuration rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the destination backend kind.
    pub fn with_durable_backend(mut self, kind: BackendKind) -> Self {
        self.durable_backend = kind;
        self
    }

    /// Set the progress log interval.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }
}

/// Configuration for one dump, load, or export pass.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Target data file.
    pub data_file: PathBuf,

    /// On-disk format.
    pub format: CodecFormat,

    /// What a load does when the destination already holds a key.
    /// Applies to the line-delimited text format only.
    pub duplicate_policy: DuplicatePolicy,
}

impl TransferConfig {
    /// Create a configuration for the given data file and format.
    pub fn new(data_file: impl Into<PathBuf>, format: CodecFormat) -> Self {
        Self {
            data_file: data_file.into(),
            format,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// Set the duplicate policy for text-format loads.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Optional TOML configuration file for the dump/load tool.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolConfig {
    /// Backend the named cache should be opened as.
    pub backend: BackendKind,

    /// Duplicate policy for text-format loads.
    pub duplicate_policy: DuplicatePolicy,
}

impl ToolConfig {
    /// Load the configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }
}
