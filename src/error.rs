//! Error types for csi-sniffer.
//!
//! Errors are split by who can observe them:
//! - **Startup errors** ([`SnifferError`]): returned from
//!   [`SnifferBuilder::start()`](crate::SnifferBuilder::start); the caller is
//!   expected to abort the capture phase
//! - **Writer errors** ([`WriterError`]): fatal to one stream's writer task
//!   only, surfaced as [`CaptureEvent::WriterFailed`](crate::CaptureEvent::WriterFailed)
//! - **Capture loss**: queue overflow in the receive callbacks is never an
//!   error; it is counted and reported later from task context

use std::path::PathBuf;

use crate::record::ReadError;
use crate::StreamKind;

/// Fatal errors that prevent the capture pipeline from starting.
#[derive(Debug, thiserror::Error)]
pub enum SnifferError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A radio driver call failed.
    #[error("radio {operation} failed: {source}")]
    Radio {
        /// The driver operation that failed.
        operation: &'static str,
        /// The driver's error.
        #[source]
        source: RadioError,
    },

    /// Teardown did not finish within the configured timeout.
    #[error("{stream} writer did not stop within {timeout_ms}ms")]
    ShutdownTimedOut {
        /// Stream whose writer was aborted.
        stream: StreamKind,
        /// The timeout that elapsed.
        timeout_ms: u64,
    },
}

impl SnifferError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Wraps a driver error with the operation that produced it.
    pub fn radio(operation: &'static str, source: RadioError) -> Self {
        Self::Radio { operation, source }
    }
}

/// Errors reported synchronously by a [`RadioDriver`](crate::RadioDriver).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RadioError {
    /// The radio is not in monitor mode.
    #[error("radio not started")]
    NotStarted,

    /// The channel is outside the legal set.
    #[error("invalid channel {0}")]
    InvalidChannel(u8),

    /// A callback is already registered for this stream.
    #[error("{0} callback already installed")]
    AlreadyInstalled(StreamKind),

    /// Any other driver failure.
    #[error("driver error: {0}")]
    Driver(String),
}

impl RadioError {
    /// Creates a generic driver error.
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }
}

/// Errors that end a persistence writer task.
///
/// Individual record write failures are not in this list: they are counted
/// and reported as events, and the writer keeps running.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// The log file could not be opened for append.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path of the log.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The log's size could not be determined.
    #[error("failed to stat {path}: {source}")]
    Metadata {
        /// Path of the log.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The one-time header write failed.
    #[error("failed to write header to {path}: {source}")]
    Header {
        /// Path of the log.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The existing log was written for another stream or layout version.
    #[error("incompatible log {path}: {source}")]
    IncompatibleLog {
        /// Path of the log.
        path: PathBuf,
        /// Why the existing header was rejected.
        #[source]
        source: ReadError,
    },

    /// A partial record or header could not be cut from the end of the log.
    #[error("failed to truncate {path}: {source}")]
    Repair {
        /// Path of the log.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking I/O task could not be joined.
    #[error("writer I/O task failed: {0}")]
    Join(String),
}

impl WriterError {
    /// The log path, when the error is tied to one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Open { path, .. }
            | Self::Metadata { path, .. }
            | Self::Header { path, .. }
            | Self::IncompatibleLog { path, .. }
            | Self::Repair { path, .. } => Some(path),
            Self::Join(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_error_display() {
        let err = SnifferError::radio("set_channel", RadioError::InvalidChannel(14));
        assert_eq!(err.to_string(), "radio set_channel failed: invalid channel 14");
    }

    #[test]
    fn test_invalid_config_display() {
        let err = SnifferError::invalid_config("queue capacity must be non-zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration: queue capacity must be non-zero"
        );
    }

    #[test]
    fn test_already_installed_display() {
        let err = RadioError::AlreadyInstalled(StreamKind::Csi);
        assert_eq!(err.to_string(), "csi callback already installed");
    }

    #[test]
    fn test_writer_error_carries_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = WriterError::Open {
            path: PathBuf::from("/sdcard/l2.bin"),
            source: io_err,
        };
        assert!(err.to_string().contains("/sdcard/l2.bin"));
        assert_eq!(err.path(), Some(&PathBuf::from("/sdcard/l2.bin")));
    }

    #[test]
    fn test_incompatible_log_display() {
        let err = WriterError::IncompatibleLog {
            path: PathBuf::from("/sdcard/l2.bin"),
            source: ReadError::WrongStream {
                expected: StreamKind::Frame,
                found: StreamKind::Csi,
            },
        };
        assert_eq!(
            err.to_string(),
            "incompatible log /sdcard/l2.bin: expected a frame log, found a csi log"
        );
    }
}
