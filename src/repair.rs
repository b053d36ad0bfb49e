//! Back-reference repair for legacy tracked-content records.
//!
//! Some historical records were serialized with the owning tracking key
//! missing from their upload/download entries. This pass backfills the
//! reference before a record is written to the destination. It is purely
//! additive: entries that already carry a reference are never touched.

use crate::types::TrackedContent;

/// Backfill absent back-references with the record's own key.
///
/// Returns the number of entries amended.
pub fn amend_tracking_key(record: &mut TrackedContent) -> usize {
    let key = record.key.clone();
    let mut amended = 0;

    for entry in record
        .uploads
        .iter_mut()
        .chain(record.downloads.iter_mut())
    {
        if entry.tracking_key.is_none() {
            entry.tracking_key = Some(key.clone());
            amended += 1;
        }
    }

    amended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TrackedContentEntry, TrackingKey};

    #[test]
    fn test_repair_is_additive() {
        let key = TrackingKey::new("build-1");
        let other = TrackingKey::new("build-0");

        // One entry missing the reference, one already populated with a
        // different key. Only the missing one may change.
        let mut record = TrackedContent::new(key.clone())
            .with_upload(TrackedContentEntry::new("maven:hosted:local", "/a.jar"))
            .with_download(
                TrackedContentEntry::new("maven:remote:central", "/b.jar")
                    .with_tracking_key(other.clone()),
            );

        let amended = amend_tracking_key(&mut record);

        assert_eq!(amended, 1);
        assert_eq!(record.uploads[0].tracking_key, Some(key));
        assert_eq!(record.downloads[0].tracking_key, Some(other));
    }

    #[test]
    fn test_repair_noop_when_fully_populated() {
        let key = TrackingKey::new("build-2");
        let mut record = TrackedContent::new(key.clone()).with_upload(
            TrackedContentEntry::new("maven:hosted:local", "/a.jar").with_tracking_key(key),
        );

        assert_eq!(amend_tracking_key(&mut record), 0);
    }

    #[test]
    fn test_repair_amends_both_sets() {
        let key = TrackingKey::new("build-3");
        let mut record = TrackedContent::new(key.clone())
            .with_upload(TrackedContentEntry::new("s1", "/u.jar"))
            .with_download(TrackedContentEntry::new("s2", "/d.jar"));

        assert_eq!(amend_tracking_key(&mut record), 2);
        assert!(record
            .uploads
            .iter()
            .chain(record.downloads.iter())
            .all(|e| e.tracking_key.as_ref() == Some(&key)));
    }
}
