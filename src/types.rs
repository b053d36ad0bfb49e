//! Core types for tracked-content records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for one tracked build or session.
///
/// The stable string form returned by [`TrackingKey::id`] is the identity
/// used in checkpoint files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackingKey(String);

impl TrackingKey {
    /// Create a new tracking key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The stable string form of this key.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackingKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One upload or download captured by the tracking subsystem.
///
/// `tracking_key` is a denormalized back-reference to the owning record.
/// Legacy records may carry `None` here due to a historical serialization
/// defect; see [`crate::repair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedContentEntry {
    /// Artifact store the content was served from or uploaded to.
    pub store_key: String,

    /// Path of the content within the store.
    pub path: String,

    /// Remote origin the content was proxied from, if any.
    pub origin_url: Option<String>,

    /// MD5 checksum of the content.
    pub md5: Option<String>,

    /// SHA-1 checksum of the content.
    pub sha1: Option<String>,

    /// SHA-256 checksum of the content.
    pub sha256: Option<String>,

    /// Content size in bytes.
    pub size: u64,

    /// Back-reference to the owning tracking key.
    pub tracking_key: Option<TrackingKey>,
}

impl TrackedContentEntry {
    /// Create an entry with the given store key and path.
    pub fn new(store_key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            store_key: store_key.into(),
            path: path.into(),
            origin_url: None,
            md5: None,
            sha1: None,
            sha256: None,
            size: 0,
            tracking_key: None,
        }
    }

    /// Set the content size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the SHA-256 checksum.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Set the back-reference to the owning tracking key.
    pub fn with_tracking_key(mut self, key: TrackingKey) -> Self {
        self.tracking_key = Some(key);
        self
    }
}

/// The sealed record for one tracking key.
///
/// Sealed records are closed for further writes by the upstream tracking
/// subsystem before they become eligible for migration. The migration
/// engine only reads them; it never mutates the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedContent {
    /// The key this record belongs to.
    pub key: TrackingKey,

    /// Uploads captured for this key.
    pub uploads: Vec<TrackedContentEntry>,

    /// Downloads captured for this key.
    pub downloads: Vec<TrackedContentEntry>,
}

impl TrackedContent {
    /// Create an empty sealed record for the given key.
    pub fn new(key: TrackingKey) -> Self {
        Self {
            key,
            uploads: Vec::new(),
            downloads: Vec::new(),
        }
    }

    /// Add an upload entry.
    pub fn with_upload(mut self, entry: TrackedContentEntry) -> Self {
        self.uploads.push(entry);
        self
    }

    /// Add a download entry.
    pub fn with_download(mut self, entry: TrackedContentEntry) -> Self {
        self.downloads.push(entry);
        self
    }

    /// Total number of entries across uploads and downloads.
    pub fn entry_count(&self) -> usize {
        self.uploads.len() + self.downloads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_key_identity() {
        let key = TrackingKey::new("build-4711");
        assert_eq!(key.id(), "build-4711");
        assert_eq!(key.to_string(), "build-4711");
        assert_eq!(key, TrackingKey::from("build-4711"));
    }

    #[test]
    fn test_tracked_content_builders() {
        let key = TrackingKey::new("build-1");
        let record = TrackedContent::new(key.clone())
            .with_upload(TrackedContentEntry::new("maven:hosted:local", "/a.jar").with_size(10))
            .with_download(TrackedContentEntry::new("maven:remote:central", "/b.jar"));

        assert_eq!(record.key, key);
        assert_eq!(record.entry_count(), 2);
        assert!(record.uploads[0].tracking_key.is_none());
    }
}
