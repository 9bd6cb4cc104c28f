//! Captured link-layer frame record.

use crate::record::{copy_truncated, FieldReader, LogRecord};
use crate::StreamKind;

/// Bytes of the raw MAC header kept per frame.
pub const HEADER_CAPACITY: usize = 36;

/// Bytes of frame body kept for management and control frames.
pub const PAYLOAD_CAPACITY: usize = 128;

/// 802.11 frame type, taken from bits 2-3 of the frame control octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameClass {
    /// Management frames (beacons, probes, association).
    Management = 0,
    /// Control frames (RTS, CTS, ACK).
    Control = 1,
    /// Data frames. Their bodies are never persisted.
    Data = 2,
    /// Extension frames.
    Extension = 3,
}

impl FrameClass {
    /// Maps the two-bit type field to a class.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Management,
            1 => Self::Control,
            2 => Self::Data,
            _ => Self::Extension,
        }
    }
}

/// Splits the first frame control octet into `(class, subtype)`.
///
/// Class is bits 2-3 and subtype bits 4-7; bits 0-1 are the protocol version.
pub const fn classify(frame_control: u8) -> (FrameClass, u8) {
    (
        FrameClass::from_bits(frame_control >> 2),
        (frame_control >> 4) & 0x0F,
    )
}

/// One captured frame: radio metadata, the leading MAC header bytes and,
/// for non-data frames, the start of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    /// Capture time, in the units of the configured timestamp source.
    pub timestamp: i64,
    /// Frame type.
    pub class: FrameClass,
    /// Frame subtype (4 bits).
    pub subtype: u8,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Channel the frame was received on.
    pub channel: u8,
    /// Valid bytes in `header`.
    pub header_len: u8,
    /// Valid bytes in `payload`; always 0 for data frames.
    pub payload_len: u16,
    /// Leading bytes of the raw MAC header, zero padded.
    pub header: [u8; HEADER_CAPACITY],
    /// Leading bytes of the frame body, zero padded.
    pub payload: [u8; PAYLOAD_CAPACITY],
}

impl FrameRecord {
    /// Builds a record from a transient driver buffer.
    ///
    /// `captured_len` is the length reported by the radio; it is clamped to
    /// the bytes actually present in `raw`. Returns `None` for an empty
    /// capture, which has no frame control octet to classify.
    ///
    /// Does not allocate.
    pub fn from_raw(
        raw: &[u8],
        captured_len: usize,
        timestamp: i64,
        rssi: i8,
        channel: u8,
    ) -> Option<Self> {
        let captured = &raw[..captured_len.min(raw.len())];
        let (class, subtype) = classify(*captured.first()?);

        let mut header = [0u8; HEADER_CAPACITY];
        let header_len = copy_truncated(&mut header, captured);

        let mut payload = [0u8; PAYLOAD_CAPACITY];
        let payload_len = if class == FrameClass::Data {
            0
        } else {
            copy_truncated(&mut payload, &captured[header_len..])
        };

        Some(Self {
            timestamp,
            class,
            subtype,
            rssi,
            channel,
            header_len: header_len as u8,
            payload_len: payload_len as u16,
            header,
            payload,
        })
    }

    /// The valid header bytes.
    pub fn header_bytes(&self) -> &[u8] {
        &self.header[..usize::from(self.header_len).min(HEADER_CAPACITY)]
    }

    /// The valid payload bytes.
    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload[..usize::from(self.payload_len).min(PAYLOAD_CAPACITY)]
    }
}

impl LogRecord for FrameRecord {
    const STREAM: StreamKind = StreamKind::Frame;
    const ENCODED_LEN: usize = 8 + 1 + 1 + 1 + 1 + 1 + 1 + 2 + HEADER_CAPACITY + PAYLOAD_CAPACITY;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.push(self.class as u8);
        out.push(self.subtype);
        out.extend_from_slice(&self.rssi.to_le_bytes());
        out.push(self.channel);
        out.push(self.header_len);
        out.push(0); // reserved
        out.extend_from_slice(&self.payload_len.to_le_bytes());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut r = FieldReader::new(bytes);
        let timestamp = r.i64();
        let class = FrameClass::from_bits(r.u8());
        let subtype = r.u8();
        let rssi = r.i8();
        let channel = r.u8();
        let header_len = r.u8();
        let _reserved = r.u8();
        let payload_len = r.u16();

        Some(Self {
            timestamp,
            class,
            subtype,
            rssi,
            channel,
            header_len,
            payload_len,
            header: r.array(),
            payload: r.array(),
        })
    }
}
