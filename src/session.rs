//! Capture session management.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::{HopperHandle, WriterHandle};
use crate::radio::RadioDriver;
use crate::stats::{StreamCounters, StreamStats};
use crate::{SnifferError, StreamKind};

/// Statistics about a capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frame stream statistics, if the stream is enabled.
    pub frame: Option<StreamStats>,
    /// CSI stream statistics, if the stream is enabled.
    pub csi: Option<StreamStats>,
    /// Successful channel changes made by the hopper.
    pub channel_hops: u64,
}

impl SessionStats {
    /// Statistics for `stream`, if it is enabled.
    pub fn stream(&self, stream: StreamKind) -> Option<StreamStats> {
        match stream {
            StreamKind::Frame => self.frame,
            StreamKind::Csi => self.csi,
        }
    }
}

/// Handle to a running capture pipeline.
///
/// Returned by [`SnifferBuilder::start()`]. Capture runs in the driver's
/// receive context and in background tasks until [`stop()`](Self::stop) is
/// called or the session is dropped.
///
/// # Lifecycle
///
/// 1. Created by [`SnifferBuilder::start()`]
/// 2. Callbacks fill the queues, writers append to the logs, the hopper
///    retunes the radio
/// 3. Call [`stop()`](Self::stop) for an ordered shutdown
/// 4. Dropping the session also tears down (best effort, without waiting
///    for writers to close their files)
///
/// Teardown order is the reverse of startup: callbacks are removed first so
/// no new records are produced, then the hopper and writers stop, then
/// monitor mode is disabled. Any step that never started is skipped.
///
/// # Example
///
/// ```ignore
/// let session = Sniffer::builder()
///     .identity(identity)
///     .start(radio)
///     .await?;
///
/// tokio::time::sleep(Duration::from_secs(60)).await;
/// println!("{:?}", session.stats());
/// session.stop().await?;
/// ```
///
/// [`SnifferBuilder::start()`]: crate::SnifferBuilder::start
pub struct CaptureSession {
    radio: Arc<dyn RadioDriver>,
    streams: Vec<(StreamKind, Arc<StreamCounters>)>,
    installed: Vec<StreamKind>,
    writers: Vec<WriterHandle>,
    hopper: Option<HopperHandle>,
    hops: Arc<AtomicU64>,
    monitor_active: bool,
    running: bool,
    stop_timeout: Duration,
}

impl CaptureSession {
    /// Creates an empty session; the builder fills it in as each part starts.
    pub(crate) fn new(radio: Arc<dyn RadioDriver>, stop_timeout: Duration) -> Self {
        Self {
            radio,
            streams: Vec::new(),
            installed: Vec::new(),
            writers: Vec::new(),
            hopper: None,
            hops: Arc::new(AtomicU64::new(0)),
            monitor_active: false,
            running: true,
            stop_timeout,
        }
    }

    pub(crate) fn monitor_started(&mut self) {
        self.monitor_active = true;
    }

    /// Registers an enabled stream and returns its counters.
    pub(crate) fn register_stream(&mut self, stream: StreamKind) -> Arc<StreamCounters> {
        let counters = Arc::new(StreamCounters::new());
        self.streams.push((stream, Arc::clone(&counters)));
        counters
    }

    pub(crate) fn callback_installed(&mut self, stream: StreamKind) {
        self.installed.push(stream);
    }

    pub(crate) fn add_writer(&mut self, writer: WriterHandle) {
        self.writers.push(writer);
    }

    pub(crate) fn set_hopper(&mut self, hopper: HopperHandle) {
        self.hopper = Some(hopper);
    }

    pub(crate) fn hop_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.hops)
    }

    /// Returns `true` until the session has been stopped.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The streams this session captures, in startup order.
    pub fn enabled_streams(&self) -> Vec<StreamKind> {
        self.streams.iter().map(|(stream, _)| *stream).collect()
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats {
            channel_hops: self.hops.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (stream, counters) in &self.streams {
            match stream {
                StreamKind::Frame => stats.frame = Some(counters.snapshot()),
                StreamKind::Csi => stats.csi = Some(counters.snapshot()),
            }
        }
        stats
    }

    /// Stops capture and closes the logs.
    ///
    /// Records still in a queue are discarded. Every teardown step runs even
    /// if an earlier one fails; the first error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SnifferError::ShutdownTimedOut`] if a writer had to be
    /// aborted, or [`SnifferError::Radio`] if the driver refused to leave
    /// monitor mode.
    pub async fn stop(mut self) -> Result<(), SnifferError> {
        self.teardown().await
    }

    fn remove_callback(&self, stream: StreamKind) -> Result<(), SnifferError> {
        let (operation, result) = match stream {
            StreamKind::Frame => ("remove_frame_callback", self.radio.remove_frame_callback()),
            StreamKind::Csi => ("remove_csi_callback", self.radio.remove_csi_callback()),
        };
        result.map_err(|e| SnifferError::radio(operation, e))
    }

    /// Idempotent ordered teardown; tolerates partially started sessions.
    pub(crate) async fn teardown(&mut self) -> Result<(), SnifferError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        tracing::info!("stopping capture pipeline");

        let mut first_error = None;
        let mut record = |result: Result<(), SnifferError>| {
            if let Err(e) = result {
                tracing::warn!(error = %e, "teardown step failed");
                first_error.get_or_insert(e);
            }
        };

        for stream in std::mem::take(&mut self.installed) {
            record(self.remove_callback(stream));
        }

        if let Some(hopper) = self.hopper.take() {
            hopper.stop(self.stop_timeout).await;
        }

        let timeout = self.stop_timeout;
        let stops = std::mem::take(&mut self.writers)
            .into_iter()
            .map(|writer| writer.stop(timeout));
        for result in futures::future::join_all(stops).await {
            record(result);
        }
        // Producers went away with the callbacks and consumers with the
        // writers, so the queues are released here.

        if std::mem::take(&mut self.monitor_active) {
            record(
                self.radio
                    .stop_monitor()
                    .map_err(|e| SnifferError::radio("stop_monitor", e)),
            );
        }

        tracing::info!(stats = ?self.stats(), "capture pipeline stopped");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if !self.running {
            return;
        }
        // Dropped without stop(): tear down without waiting.
        self.running = false;
        for stream in std::mem::take(&mut self.installed) {
            let _ = self.remove_callback(stream);
        }
        if let Some(hopper) = self.hopper.take() {
            hopper.abort();
        }
        for writer in self.writers.drain(..) {
            writer.signal_stop();
        }
        if std::mem::take(&mut self.monitor_active) {
            let _ = self.radio.stop_monitor();
        }
    }
}
