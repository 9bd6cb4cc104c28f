//! Runtime events for monitoring capture health.
//!
//! Events are non-fatal notifications emitted from task context (writer
//! tasks, the channel hopper). The pipeline keeps running after any event;
//! they're for logging and metrics, not error handling. Nothing is ever
//! emitted from the receive callbacks.

use std::path::PathBuf;
use std::sync::Arc;

use crate::{Channel, StreamKind};

/// Runtime events emitted during capture.
///
/// # Example
///
/// ```
/// use csi_sniffer::CaptureEvent;
///
/// fn handle_event(event: CaptureEvent) {
///     match event {
///         CaptureEvent::RecordsDropped { stream, dropped, .. } => {
///             eprintln!("{stream}: dropped {dropped} records");
///         }
///         CaptureEvent::WriterFailed { stream, error } => {
///             eprintln!("{stream} writer failed: {error}");
///         }
///         other => eprintln!("{other:?}"),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A writer opened its log and is appending.
    WriterStarted {
        /// Stream the writer persists.
        stream: StreamKind,
        /// Log file path.
        path: PathBuf,
        /// True if the file was empty and a header was written.
        header_written: bool,
    },

    /// A writer closed its log on shutdown.
    WriterStopped {
        /// Stream the writer persisted.
        stream: StreamKind,
        /// Records appended during this session.
        records_written: u64,
    },

    /// A writer could not open its log or write the header, and exited.
    ///
    /// Other streams keep running.
    WriterFailed {
        /// Stream whose writer exited.
        stream: StreamKind,
        /// Description of the failure.
        error: String,
    },

    /// A record write, flush or sync failed.
    ///
    /// Not retried; the writer keeps going with the next record.
    WriteFailed {
        /// Stream whose write failed.
        stream: StreamKind,
        /// Description of the failure.
        error: String,
    },

    /// A periodic durability sync completed.
    Synced {
        /// Stream whose log was synced.
        stream: StreamKind,
        /// Records appended so far.
        records_written: u64,
    },

    /// Records were dropped on a full queue since the last report.
    RecordsDropped {
        /// Stream that dropped records.
        stream: StreamKind,
        /// Drops since the previous report.
        dropped: u64,
        /// Drops since the stream started.
        total: u64,
    },

    /// The receiver was retuned.
    ChannelHopped {
        /// New channel.
        channel: Channel,
    },

    /// The channel hopper exited before shutdown.
    HopperStopped {
        /// Why it stopped.
        reason: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`SnifferBuilder::on_event()`].
///
/// [`SnifferBuilder::on_event()`]: crate::SnifferBuilder::on_event
pub type EventCallback = Arc<dyn Fn(CaptureEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use csi_sniffer::{event_callback, CaptureEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(CaptureEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Sends `event` to `callback` if one is registered.
pub(crate) fn emit(callback: Option<&EventCallback>, event: CaptureEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}
