//! On-disk serialization codecs for the dump/load engine.
//!
//! Two interchangeable formats, both write-once, append-never, one file
//! per run:
//!
//! - [`binary`]: LZ4-frame-compressed stream of a leading `u64` record
//!   count followed by that many bincode-serialized (key, value) pairs.
//! - [`json`]: uncompressed UTF-8 text, two JSON lines per record (key
//!   line, then value line).

pub mod binary;
pub mod json;

pub use binary::{BinaryDumpReader, BinaryDumpWriter};
pub use json::{JsonLinesReader, JsonLinesWriter};

use serde::{Deserialize, Serialize};

/// Which on-disk format a dump or load uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecFormat {
    /// Length-prefixed binary, LZ4-compressed.
    Binary,
    /// Line-delimited JSON, uncompressed.
    JsonLines,
}

impl std::fmt::Display for CodecFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecFormat::Binary => write!(f, "binary"),
            CodecFormat::JsonLines => write!(f, "json-lines"),
        }
    }
}

/// What a load pass does when the destination already contains a key.
///
/// `RemoveExisting` reproduces an operator dedup-and-clean workflow in
/// which a duplicate key in the dump means the destination copy should be
/// dropped. It is deliberately not the default; `Skip` is the sane policy
/// for a fresh system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Leave the existing destination entry, drop the incoming one.
    #[default]
    Skip,
    /// Remove the existing destination entry as well.
    RemoveExisting,
}
