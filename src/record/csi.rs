//! Channel State Information record.

use crate::record::{copy_truncated, FieldReader, LogRecord};
use crate::{MacAddress, StreamKind};

/// Bytes of CSI sample data kept per record.
pub const CSI_CAPACITY: usize = 128;

/// One CSI measurement reported by the radio alongside a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiRecord {
    /// Capture time, in the units of the configured timestamp source.
    pub timestamp: i64,
    /// Transmitter address of the frame that produced the sample.
    pub mac: MacAddress,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Channel the sample was taken on.
    pub channel: u8,
    /// Valid bytes in `data`.
    pub len: u16,
    /// Raw CSI sample bytes, zero padded.
    pub data: [u8; CSI_CAPACITY],
}

impl CsiRecord {
    /// Builds a record from a transient driver buffer.
    ///
    /// Samples longer than [`CSI_CAPACITY`] are truncated, never rejected.
    /// Does not allocate.
    pub fn from_raw(sample: &[u8], mac: MacAddress, timestamp: i64, rssi: i8, channel: u8) -> Self {
        let mut data = [0u8; CSI_CAPACITY];
        let len = copy_truncated(&mut data, sample);

        Self {
            timestamp,
            mac,
            rssi,
            channel,
            len: len as u16,
            data,
        }
    }

    /// The valid sample bytes.
    pub fn sample(&self) -> &[u8] {
        &self.data[..usize::from(self.len).min(CSI_CAPACITY)]
    }
}

impl LogRecord for CsiRecord {
    const STREAM: StreamKind = StreamKind::Csi;
    const ENCODED_LEN: usize = 8 + 6 + 1 + 1 + 2 + CSI_CAPACITY;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.mac.octets());
        out.extend_from_slice(&self.rssi.to_le_bytes());
        out.push(self.channel);
        out.extend_from_slice(&self.len.to_le_bytes());
        out.extend_from_slice(&self.data);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut r = FieldReader::new(bytes);

        Some(Self {
            timestamp: r.i64(),
            mac: MacAddress::new(r.array()),
            rssi: r.i8(),
            channel: r.u8(),
            len: r.u16(),
            data: r.array(),
        })
    }
}
