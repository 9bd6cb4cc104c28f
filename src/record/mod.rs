//! Fixed-layout binary records and their on-disk encoding.
//!
//! Every capture file is a [`FileHeader`] followed by zero or more records
//! of a single fixed width:
//!
//! ```text
//! | FileHeader (28) | record | record | record | ...
//! ```
//!
//! There is no per-record framing. The width is implied by the header's
//! identifier and version, so a file's record count is
//! `(len - FileHeader::ENCODED_LEN) / R::ENCODED_LEN`.
//!
//! All multi-byte integers are little-endian and no padding is inserted.

mod csi;
mod frame;
mod header;
mod reader;

pub use csi::{CsiRecord, CSI_CAPACITY};
pub use frame::{classify, FrameClass, FrameRecord, HEADER_CAPACITY, PAYLOAD_CAPACITY};
pub use header::{FileHeader, HeaderError};
pub use reader::{LogReader, ReadError};

use crate::StreamKind;

/// A fixed-width record that can be appended to a capture log.
///
/// Implementors are plain `Copy` values so they can be moved through the
/// capture queue without allocation.
pub trait LogRecord: Copy + Send + Sync + 'static {
    /// The stream this record type belongs to.
    const STREAM: StreamKind;

    /// Exact encoded width in bytes.
    const ENCODED_LEN: usize;

    /// Appends the exact fixed-width encoding to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decodes one record from exactly [`ENCODED_LEN`](Self::ENCODED_LEN) bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length.
    fn decode(bytes: &[u8]) -> Option<Self>;
}

/// Copies as much of `src` as fits into `dst`, returning the copied length.
pub(crate) fn copy_truncated(dst: &mut [u8], src: &[u8]) -> usize {
    let len = src.len().min(dst.len());
    dst[..len].copy_from_slice(&src[..len]);
    len
}

/// Little-endian cursor over a fixed-width record.
pub(crate) struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    pub(crate) fn u8(&mut self) -> u8 {
        self.array::<1>()[0]
    }

    pub(crate) fn i8(&mut self) -> i8 {
        i8::from_le_bytes(self.array())
    }

    pub(crate) fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    pub(crate) fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    pub(crate) fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.array())
    }

    pub(crate) fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_truncated_caps_at_destination() {
        let mut dst = [0u8; 4];
        assert_eq!(copy_truncated(&mut dst, &[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn test_copy_truncated_short_source() {
        let mut dst = [9u8; 4];
        assert_eq!(copy_truncated(&mut dst, &[1, 2]), 2);
        assert_eq!(dst, [1, 2, 9, 9]);
    }

    #[test]
    fn test_field_reader_little_endian() {
        let bytes = [0x34, 0x12, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.u16(), 0x1234);
        assert_eq!(reader.i8(), -1);
        assert_eq!(reader.u32(), 0x1234_5678);
    }
}
