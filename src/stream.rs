//! Capture stream identification.

use std::fmt;

/// One of the two independent capture streams.
///
/// Each stream has its own queue, capture callback, writer task and log
/// file, and is identified on disk by a four-byte magic.
///
/// # Example
///
/// ```
/// use csi_sniffer::StreamKind;
///
/// assert_eq!(StreamKind::Frame.identifier(), *b"L2PK");
/// assert_eq!(StreamKind::Csi.identifier(), *b"CSIP");
/// assert_eq!(StreamKind::Csi.to_string(), "csi");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    /// Link-layer frame headers from promiscuous receive.
    Frame,
    /// Channel State Information samples.
    Csi,
}

impl StreamKind {
    /// Both streams, in startup order.
    pub const ALL: [StreamKind; 2] = [StreamKind::Frame, StreamKind::Csi];

    /// File magic written at the start of the stream's log.
    pub const fn identifier(&self) -> [u8; 4] {
        match self {
            Self::Frame => *b"L2PK",
            Self::Csi => *b"CSIP",
        }
    }

    /// Current on-disk record layout version for this stream.
    ///
    /// Bumped whenever a field of the record layout changes. Readers must
    /// treat any other value as an unknown format.
    pub const fn format_version(&self) -> u32 {
        match self {
            // v1 carried resolved source/destination addresses.
            Self::Frame => 2,
            Self::Csi => 1,
        }
    }

    /// Resolves a file magic back to its stream.
    pub fn from_identifier(identifier: [u8; 4]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.identifier() == identifier)
    }

    /// Short lowercase name used in logs and events.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Csi => "csi",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which streams the pipeline captures.
///
/// Disabled streams get no queue, no callback and no writer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamSelection {
    /// Frame headers only.
    FrameOnly,
    /// CSI samples only.
    CsiOnly,
    /// Both streams.
    #[default]
    Both,
}

impl StreamSelection {
    /// Returns true if `kind` is captured under this selection.
    pub const fn includes(&self, kind: StreamKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _) | (Self::FrameOnly, StreamKind::Frame) | (Self::CsiOnly, StreamKind::Csi)
        )
    }

    /// The enabled streams, in startup order.
    pub fn streams(&self) -> impl Iterator<Item = StreamKind> + '_ {
        StreamKind::ALL
            .into_iter()
            .filter(move |kind| self.includes(*kind))
    }
}
