//! Error types for the migration and transfer engines.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration and transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate.
///
/// Only stage-fatal conditions surface through this type. Per-record
/// failures during a migration or load pass are aggregated into the run
/// report instead of being raised.
#[derive(Error, Debug)]
pub enum Error {
    /// Checkpoint file errors.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Dump file codec errors.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Cache adapter errors.
    #[error("cache adapter error: {0}")]
    Adapter(String),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// Sealed-report archival errors.
    #[error("report archive error: {0}")]
    Archive(String),
}

/// Errors reading or writing the checkpoint files.
///
/// An absent completed file is not an error; it reads as an empty set.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The checkpoint file exists but could not be read.
    #[error("failed to read checkpoint {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// The checkpoint file or its parent directory could not be written.
    #[error("failed to write checkpoint {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Errors in the dump file codecs.
#[derive(Error, Debug)]
pub enum CodecError {
    /// I/O error on the dump file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be serialized to the dump stream.
    #[error("failed to serialize {what}: {reason}")]
    Serialize { what: &'static str, reason: String },

    /// A record could not be deserialized from the dump stream.
    #[error("failed to deserialize {what} at index {index}: {reason}")]
    Deserialize {
        what: &'static str,
        index: u64,
        reason: String,
    },

    /// The stream ended before the declared record count was reached.
    #[error("unexpected end of stream at index {index}, header declared {declared} records")]
    UnexpectedEof { index: u64, declared: u64 },

    /// The leading record count does not match the number of records.
    ///
    /// This is a corruption signal, never silently tolerated.
    #[error("record count mismatch: header declared {declared}, got {actual}")]
    CountMismatch { declared: u64, actual: u64 },
}

impl CodecError {
    /// Whether this error is recoverable by skipping to the next record.
    ///
    /// Stream-level I/O failures and truncation are not; a malformed
    /// record inside an otherwise healthy stream is.
    pub fn is_per_record(&self) -> bool {
        matches!(self, CodecError::Deserialize { .. })
    }
}
