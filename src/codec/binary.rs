//! Length-prefixed binary dump codec with streaming LZ4 compression.
//!
//! File layout inside the LZ4 frame:
//!
//! ```text
//! [record_count: u64 LE][key][value][key][value]...
//! ```
//!
//! Keys and values are bincode-serialized. The leading count must equal
//! the number of pairs that follow; the writer enforces this at
//! `finish()` and the reader treats a shortfall as corruption. The count
//! is advisory for progress reporting on the read side: a truncated
//! stream yields the pairs that survived plus a reported error, not an
//! abort.

use crate::error::CodecError;
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::Path;

/// Streaming writer for the binary dump format.
///
/// Pairs are written immediately rather than buffered; the record count
/// must be known up front because it leads the stream.
pub struct BinaryDumpWriter {
    encoder: FrameEncoder<BufWriter<File>>,
    declared: u64,
    written: u64,
}

impl BinaryDumpWriter {
    /// Create a dump file declaring the given record count.
    pub fn create(path: impl AsRef<Path>, record_count: u64) -> Result<Self, CodecError> {
        let file = File::create(path.as_ref())?;
        let mut encoder = FrameEncoder::new(BufWriter::new(file));
        encoder.write_all(&record_count.to_le_bytes())?;

        Ok(Self {
            encoder,
            declared: record_count,
            written: 0,
        })
    }

    /// Write one (key, value) pair.
    pub fn write<K, V>(&mut self, key: &K, value: &V) -> Result<(), CodecError>
    where
        K: Serialize,
        V: Serialize,
    {
        bincode::serialize_into(&mut self.encoder, key).map_err(|e| CodecError::Serialize {
            what: "key",
            reason: e.to_string(),
        })?;
        bincode::serialize_into(&mut self.encoder, value).map_err(|e| CodecError::Serialize {
            what: "value",
            reason: e.to_string(),
        })?;

        self.written += 1;
        Ok(())
    }

    /// Number of pairs written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Finish the LZ4 frame and sync the file.
    ///
    /// Fails with [`CodecError::CountMismatch`] if fewer or more pairs
    /// were written than the stream declared.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.written != self.declared {
            return Err(CodecError::CountMismatch {
                declared: self.declared,
                actual: self.written,
            });
        }

        let buf_writer = self
            .encoder
            .finish()
            .map_err(|e| CodecError::Io(std::io::Error::other(e.to_string())))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| CodecError::Io(std::io::Error::other(e.to_string())))?;
        file.sync_all()?;

        Ok(())
    }
}

/// Streaming reader for the binary dump format.
pub struct BinaryDumpReader<K, V> {
    decoder: FrameDecoder<BufReader<File>>,
    declared: u64,
    index: u64,
    exhausted: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> BinaryDumpReader<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    /// Open a dump file and read the leading record count.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let file = File::open(path.as_ref())?;
        let mut decoder = FrameDecoder::new(BufReader::new(file));

        let mut count_buf = [0u8; 8];
        decoder.read_exact(&mut count_buf)?;
        let declared = u64::from_le_bytes(count_buf);

        Ok(Self {
            decoder,
            declared,
            index: 0,
            exhausted: false,
            _marker: PhantomData,
        })
    }

    /// The record count the stream declared.
    pub fn record_count(&self) -> u64 {
        self.declared
    }

    /// Number of pairs consumed so far, including failed ones.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Read the next (key, value) pair.
    ///
    /// Returns `None` once the declared count is consumed or the stream
    /// has proven unreadable. A malformed pair inside a healthy stream
    /// yields `Some(Err(..))` and iteration continues; a stream-level
    /// failure (truncation, I/O) yields one final error and then `None`.
    #[allow(clippy::type_complexity)]
    pub fn next_pair(&mut self) -> Option<Result<(K, V), CodecError>> {
        if self.exhausted || self.index >= self.declared {
            return None;
        }

        let index = self.index;
        self.index += 1;

        match self.read_pair(index) {
            Ok(pair) => Some(Ok(pair)),
            Err(e) => {
                if !e.is_per_record() {
                    self.exhausted = true;
                }
                Some(Err(e))
            }
        }
    }

    fn read_pair(&mut self, index: u64) -> Result<(K, V), CodecError> {
        let key = bincode::deserialize_from(&mut self.decoder)
            .map_err(|e| self.map_bincode_err("key", index, e))?;
        let value = bincode::deserialize_from(&mut self.decoder)
            .map_err(|e| self.map_bincode_err("value", index, e))?;
        Ok((key, value))
    }

    fn map_bincode_err(&self, what: &'static str, index: u64, e: bincode::Error) -> CodecError {
        match *e {
            bincode::ErrorKind::Io(io_err)
                if io_err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                CodecError::UnexpectedEof {
                    index,
                    declared: self.declared,
                }
            }
            bincode::ErrorKind::Io(io_err) => CodecError::Io(io_err),
            other => CodecError::Deserialize {
                what,
                index,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TrackedContent, TrackedContentEntry, TrackingKey};
    use tempfile::tempdir;

    fn record(id: &str) -> (TrackingKey, TrackedContent) {
        let key = TrackingKey::new(id);
        let content = TrackedContent::new(key.clone()).with_download(
            TrackedContentEntry::new("maven:remote:central", format!("/{id}.jar")).with_size(42),
        );
        (key, content)
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.bin");

        let mut writer = BinaryDumpWriter::create(&path, 3).unwrap();
        let originals: Vec<_> = (0..3).map(|i| record(&format!("build-{i}"))).collect();
        for (k, v) in &originals {
            writer.write(k, v).unwrap();
        }
        writer.finish().unwrap();

        let mut reader: BinaryDumpReader<TrackingKey, TrackedContent> =
            BinaryDumpReader::open(&path).unwrap();
        assert_eq!(reader.record_count(), 3);

        let mut loaded = Vec::new();
        while let Some(pair) = reader.next_pair() {
            loaded.push(pair.unwrap());
        }

        assert_eq!(loaded, originals);
    }

    #[test]
    fn test_writer_enforces_declared_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");

        let mut writer = BinaryDumpWriter::create(&path, 2).unwrap();
        let (k, v) = record("build-0");
        writer.write(&k, &v).unwrap();

        let err = writer.finish().unwrap_err();
        assert!(matches!(
            err,
            CodecError::CountMismatch {
                declared: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_truncated_stream_yields_partial_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("truncated.bin");

        // Hand-build a stream declaring 5 records but holding 2.
        {
            let file = File::create(&path).unwrap();
            let mut encoder = FrameEncoder::new(BufWriter::new(file));
            encoder.write_all(&5u64.to_le_bytes()).unwrap();
            for i in 0..2 {
                let (k, v) = record(&format!("build-{i}"));
                bincode::serialize_into(&mut encoder, &k).unwrap();
                bincode::serialize_into(&mut encoder, &v).unwrap();
            }
            encoder.finish().unwrap();
        }

        let mut reader: BinaryDumpReader<TrackingKey, TrackedContent> =
            BinaryDumpReader::open(&path).unwrap();

        let mut ok = 0;
        let mut errors = Vec::new();
        while let Some(pair) = reader.next_pair() {
            match pair {
                Ok(_) => ok += 1,
                Err(e) => errors.push(e),
            }
        }

        assert_eq!(ok, 2);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            CodecError::UnexpectedEof {
                index: 2,
                declared: 5
            }
        ));
    }

    #[test]
    fn test_empty_dump() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");

        BinaryDumpWriter::create(&path, 0).unwrap().finish().unwrap();

        let mut reader: BinaryDumpReader<TrackingKey, TrackedContent> =
            BinaryDumpReader::open(&path).unwrap();
        assert_eq!(reader.record_count(), 0);
        assert!(reader.next_pair().is_none());
    }
}
