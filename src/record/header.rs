//! Capture file preamble.

use crate::record::FieldReader;
use crate::{DeviceIdentity, MacAddress, StreamKind};

/// Why a byte sequence is not a header this build understands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// Fewer bytes than a full header.
    #[error("header truncated: {len} of {} bytes", FileHeader::ENCODED_LEN)]
    Truncated {
        /// Bytes available.
        len: usize,
    },

    /// The identifier is not a known stream magic.
    #[error("unknown file identifier {identifier:?}")]
    UnknownIdentifier {
        /// The four bytes found.
        identifier: [u8; 4],
    },

    /// Known stream, but a record layout version this build cannot read.
    #[error("unsupported {stream} format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Stream named by the identifier.
        stream: StreamKind,
        /// Version found in the file.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },
}

/// Fixed preamble written once at the start of every capture file.
///
/// Layout (28 bytes, little-endian):
///
/// ```text
/// 0  identifier [4]   "L2PK" | "CSIP"
/// 4  version    u32
/// 8  start_time u64   Unix seconds at file creation
/// 16 wifi_mac   [6]
/// 22 bt_mac     [6]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Stream magic.
    pub identifier: [u8; 4],
    /// Record layout version.
    pub version: u32,
    /// Wall-clock capture start, Unix seconds.
    pub start_time: u64,
    /// WiFi MAC of the capturing device.
    pub wifi_mac: MacAddress,
    /// Bluetooth MAC of the capturing device.
    pub bt_mac: MacAddress,
}

impl FileHeader {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 4 + 4 + 8 + 6 + 6;

    /// Builds the header for a new file of `stream` at the current layout version.
    pub fn new(stream: StreamKind, start_time: u64, identity: &DeviceIdentity) -> Self {
        Self {
            identifier: stream.identifier(),
            version: stream.format_version(),
            start_time,
            wifi_mac: identity.wifi_mac,
            bt_mac: identity.bt_mac,
        }
    }

    /// The stream named by the identifier, if known.
    pub fn stream(&self) -> Option<StreamKind> {
        StreamKind::from_identifier(self.identifier)
    }

    /// Encodes the header.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..4].copy_from_slice(&self.identifier);
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..16].copy_from_slice(&self.start_time.to_le_bytes());
        out[16..22].copy_from_slice(&self.wifi_mac.octets());
        out[22..28].copy_from_slice(&self.bt_mac.octets());
        out
    }

    /// Decodes and validates a header from the start of `bytes`.
    ///
    /// The identifier must name a known stream and the version must match
    /// that stream's current layout exactly; anything else is an unknown
    /// format and is never reinterpreted.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(HeaderError::Truncated { len: bytes.len() });
        }
        let mut r = FieldReader::new(&bytes[..Self::ENCODED_LEN]);
        let header = Self {
            identifier: r.array(),
            version: r.u32(),
            start_time: r.u64(),
            wifi_mac: MacAddress::new(r.array()),
            bt_mac: MacAddress::new(r.array()),
        };

        let stream = header
            .stream()
            .ok_or(HeaderError::UnknownIdentifier {
                identifier: header.identifier,
            })?;
        if header.version != stream.format_version() {
            return Err(HeaderError::UnsupportedVersion {
                stream,
                found: header.version,
                expected: stream.format_version(),
            });
        }

        Ok(header)
    }
}
