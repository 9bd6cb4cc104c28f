//! Sequential reader for capture logs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::record::{FileHeader, HeaderError, LogRecord};
use crate::StreamKind;

/// Errors raised while reading a capture log.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The file could not be opened or read.
    #[error("read error: {path}: {source}")]
    Io {
        /// Path of the log.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The header is missing, truncated or names an unknown format.
    #[error("unknown format: {0}")]
    UnknownFormat(#[from] HeaderError),

    /// The file belongs to a different stream than requested.
    #[error("expected a {expected} log, found a {found} log")]
    WrongStream {
        /// Stream the caller asked for.
        expected: StreamKind,
        /// Stream named in the header.
        found: StreamKind,
    },

    /// The file ends in the middle of a record.
    #[error("truncated record: {trailing} trailing bytes")]
    TruncatedRecord {
        /// Bytes after the last complete record.
        trailing: u64,
    },
}

/// Reads a capture log written by the persistence writer.
///
/// The header is validated on [`open`](Self::open); records are then
/// yielded in file order. A trailing partial record (for example after
/// power loss mid-write) is reported once as
/// [`ReadError::TruncatedRecord`] and never decoded.
///
/// # Example
///
/// ```no_run
/// use csi_sniffer::{FrameRecord, LogReader};
///
/// let reader = LogReader::<FrameRecord>::open("/sdcard/l2.bin")?;
/// println!("{} frames", reader.record_count());
/// for record in reader {
///     let record = record?;
///     println!("{:?} rssi={}", record.class, record.rssi);
/// }
/// # Ok::<(), csi_sniffer::ReadError>(())
/// ```
pub struct LogReader<R: LogRecord> {
    path: PathBuf,
    header: FileHeader,
    reader: BufReader<File>,
    remaining: u64,
    buf: Vec<u8>,
    _record: PhantomData<R>,
}

impl<R: LogRecord> LogReader<R> {
    /// Opens a log and validates its header against `R`'s stream and version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| ReadError::Io {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        let mut reader = BufReader::new(file);

        let header_len = FileHeader::ENCODED_LEN as u64;
        if len < header_len {
            return Err(HeaderError::Truncated { len: len as usize }.into());
        }
        let mut raw = [0u8; FileHeader::ENCODED_LEN];
        reader.read_exact(&mut raw).map_err(io_err)?;
        let header = FileHeader::decode(&raw)?;

        let found = header.stream().ok_or(HeaderError::UnknownIdentifier {
            identifier: header.identifier,
        })?;
        if found != R::STREAM {
            return Err(ReadError::WrongStream {
                expected: R::STREAM,
                found,
            });
        }

        Ok(Self {
            path,
            header,
            reader,
            remaining: len - header_len,
            buf: vec![0u8; R::ENCODED_LEN],
            _record: PhantomData,
        })
    }

    /// The validated file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Number of complete records not yet read.
    pub fn record_count(&self) -> u64 {
        self.remaining / R::ENCODED_LEN as u64
    }
}

impl<R: LogRecord> Iterator for LogReader<R> {
    type Item = Result<R, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let width = R::ENCODED_LEN as u64;
        if self.remaining == 0 {
            return None;
        }
        if self.remaining < width {
            let trailing = self.remaining;
            self.remaining = 0;
            return Some(Err(ReadError::TruncatedRecord { trailing }));
        }

        if let Err(source) = self.reader.read_exact(&mut self.buf) {
            self.remaining = 0;
            return Some(Err(ReadError::Io {
                path: self.path.clone(),
                source,
            }));
        }
        self.remaining -= width;

        // The buffer is always exactly ENCODED_LEN, so decode cannot fail.
        R::decode(&self.buf).map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CsiRecord, DeviceIdentity, FrameRecord, MacAddress};
    use std::io::Write;
    use tempfile::tempdir;

    fn write_log(path: &Path, stream: StreamKind, records: &[u8]) {
        let mut file = File::create(path).unwrap();
        let header = FileHeader::new(stream, 100, &DeviceIdentity::default());
        file.write_all(&header.encode()).unwrap();
        file.write_all(records).unwrap();
    }

    #[test]
    fn test_reads_records_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("csi.bin");

        let mut body = Vec::new();
        for i in 0..3 {
            CsiRecord::from_raw(&[i as u8; 4], MacAddress::UNSPECIFIED, i, -50, 1)
                .encode_into(&mut body);
        }
        write_log(&path, StreamKind::Csi, &body);

        let reader = LogReader::<CsiRecord>::open(&path).unwrap();
        assert_eq!(reader.record_count(), 3);
        assert_eq!(reader.header().start_time, 100);

        let timestamps: Vec<i64> = reader.map(|r| r.unwrap().timestamp).collect();
        assert_eq!(timestamps, vec![0, 1, 2]);
    }

    #[test]
    fn test_header_only_file_has_no_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("l2.bin");
        write_log(&path, StreamKind::Frame, &[]);

        let mut reader = LogReader::<FrameRecord>::open(&path).unwrap();
        assert_eq!(reader.record_count(), 0);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_trailing_partial_record_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("csi.bin");

        let mut body = Vec::new();
        CsiRecord::from_raw(&[1], MacAddress::UNSPECIFIED, 7, -50, 1).encode_into(&mut body);
        body.extend_from_slice(&[0xEE; 10]);
        write_log(&path, StreamKind::Csi, &body);

        let mut reader = LogReader::<CsiRecord>::open(&path).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().timestamp, 7);
        assert!(matches!(
            reader.next(),
            Some(Err(ReadError::TruncatedRecord { trailing: 10 }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_wrong_stream_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("csi.bin");
        write_log(&path, StreamKind::Csi, &[]);

        let result = LogReader::<FrameRecord>::open(&path);
        assert!(matches!(
            result,
            Err(ReadError::WrongStream {
                expected: StreamKind::Frame,
                found: StreamKind::Csi
            })
        ));
    }

    #[test]
    fn test_empty_file_is_unknown_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("l2.bin");
        File::create(&path).unwrap();

        let result = LogReader::<FrameRecord>::open(&path);
        assert!(matches!(result, Err(ReadError::UnknownFormat(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = LogReader::<FrameRecord>::open("/nonexistent/dir/l2.bin");
        let err = result.err().unwrap();
        assert!(err.to_string().contains("nonexistent"));
    }
}
