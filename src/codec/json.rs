//! Line-delimited JSON dump codec.
//!
//! Each record is exactly two lines of UTF-8 text: the key as one JSON
//! document, then the value as one JSON document. No compression, no
//! leading count; end of file ends the stream.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;

/// Writer for the line-delimited JSON dump format.
pub struct JsonLinesWriter {
    writer: BufWriter<File>,
    written: u64,
}

impl JsonLinesWriter {
    /// Create a dump file at the given path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Write one (key, value) pair as two JSON lines.
    pub fn write<K, V>(&mut self, key: &K, value: &V) -> Result<(), CodecError>
    where
        K: Serialize,
        V: Serialize,
    {
        let key_line = serde_json::to_string(key).map_err(|e| CodecError::Serialize {
            what: "key",
            reason: e.to_string(),
        })?;
        let value_line = serde_json::to_string(value).map_err(|e| CodecError::Serialize {
            what: "value",
            reason: e.to_string(),
        })?;

        self.writer.write_all(key_line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.write_all(value_line.as_bytes())?;
        self.writer.write_all(b"\n")?;

        self.written += 1;
        Ok(())
    }

    /// Number of pairs written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and sync the file.
    pub fn finish(mut self) -> Result<(), CodecError> {
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| CodecError::Io(std::io::Error::other(e.to_string())))?;
        file.sync_all()?;
        Ok(())
    }
}

/// Reader for the line-delimited JSON dump format.
pub struct JsonLinesReader<K, V> {
    lines: std::io::Lines<BufReader<File>>,
    index: u64,
    exhausted: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> JsonLinesReader<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    /// Open a dump file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            index: 0,
            exhausted: false,
            _marker: PhantomData,
        })
    }

    /// Number of pairs consumed so far, including failed ones.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Read the next (key, value) pair.
    ///
    /// Both lines of a record are consumed before parsing, so a
    /// malformed record yields `Some(Err(..))` and iteration continues
    /// with the next pair. A key line without a following value line is
    /// a truncated stream and ends iteration.
    #[allow(clippy::type_complexity)]
    pub fn next_pair(&mut self) -> Option<Result<(K, V), CodecError>> {
        if self.exhausted {
            return None;
        }

        let key_line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => {
                self.exhausted = true;
                return Some(Err(CodecError::Io(e)));
            }
        };

        let index = self.index;
        self.index += 1;

        let value_line = match self.lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                self.exhausted = true;
                return Some(Err(CodecError::Io(e)));
            }
            None => {
                self.exhausted = true;
                return Some(Err(CodecError::Deserialize {
                    what: "value",
                    index,
                    reason: "key line without value line (truncated dump)".to_string(),
                }));
            }
        };

        Some(Self::parse_pair(index, &key_line, &value_line))
    }

    fn parse_pair(index: u64, key_line: &str, value_line: &str) -> Result<(K, V), CodecError> {
        let key = serde_json::from_str(key_line).map_err(|e| CodecError::Deserialize {
            what: "key",
            index,
            reason: e.to_string(),
        })?;
        let value = serde_json::from_str(value_line).map_err(|e| CodecError::Deserialize {
            what: "value",
            index,
            reason: e.to_string(),
        })?;
        Ok((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TrackedContent, TrackedContentEntry, TrackingKey};
    use std::fs;
    use tempfile::tempdir;

    fn record(id: &str) -> (TrackingKey, TrackedContent) {
        let key = TrackingKey::new(id);
        let content = TrackedContent::new(key.clone())
            .with_upload(TrackedContentEntry::new("maven:hosted:local", format!("/{id}.pom")));
        (key, content)
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let originals: Vec<_> = (0..4).map(|i| record(&format!("build-{i}"))).collect();
        let mut writer = JsonLinesWriter::create(&path).unwrap();
        for (k, v) in &originals {
            writer.write(k, v).unwrap();
        }
        writer.finish().unwrap();

        let mut reader: JsonLinesReader<TrackingKey, TrackedContent> =
            JsonLinesReader::open(&path).unwrap();
        let mut loaded = Vec::new();
        while let Some(pair) = reader.next_pair() {
            loaded.push(pair.unwrap());
        }

        assert_eq!(loaded, originals);
    }

    #[test]
    fn test_two_lines_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let mut writer = JsonLinesWriter::create(&path).unwrap();
        let (k, v) = record("build-0");
        writer.write(&k, &v).unwrap();
        writer.finish().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[test]
    fn test_malformed_record_does_not_stop_iteration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let (k1, v1) = record("build-1");
        let good_key = serde_json::to_string(&k1).unwrap();
        let good_value = serde_json::to_string(&v1).unwrap();
        fs::write(
            &path,
            format!("not-json\nalso-not-json\n{good_key}\n{good_value}\n"),
        )
        .unwrap();

        let mut reader: JsonLinesReader<TrackingKey, TrackedContent> =
            JsonLinesReader::open(&path).unwrap();

        let first = reader.next_pair().unwrap();
        assert!(matches!(first, Err(CodecError::Deserialize { index: 0, .. })));

        let second = reader.next_pair().unwrap().unwrap();
        assert_eq!(second, (k1, v1));

        assert!(reader.next_pair().is_none());
    }

    #[test]
    fn test_missing_value_line_is_truncation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let (k1, _) = record("build-1");
        fs::write(&path, format!("{}\n", serde_json::to_string(&k1).unwrap())).unwrap();

        let mut reader: JsonLinesReader<TrackingKey, TrackedContent> =
            JsonLinesReader::open(&path).unwrap();

        let only = reader.next_pair().unwrap();
        assert!(matches!(only, Err(CodecError::Deserialize { .. })));
        assert!(reader.next_pair().is_none());
    }
}
