//! Builder pattern for the capture pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::{
    capture_queue, csi_callback, frame_callback, unix_time, CaptureClock, ChannelHopper,
    HopperHandle, LogWriter, WriterHandle,
};
use crate::radio::RadioDriver;
use crate::record::{FileHeader, LogRecord};
use crate::session::CaptureSession;
use crate::stats::StreamCounters;
use crate::{
    event_callback, CaptureEvent, CsiRecord, DeviceIdentity, EventCallback, FrameRecord,
    SnifferConfig, SnifferError, StreamKind, StreamSelection,
};

/// Builder for configuring and starting the capture pipeline.
///
/// Use [`Sniffer::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use csi_sniffer::{DeviceIdentity, MockRadio, Sniffer, StreamSelection};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), csi_sniffer::SnifferError> {
/// let dir = tempfile::tempdir().unwrap();
/// let radio = Arc::new(MockRadio::new());
///
/// let session = Sniffer::builder()
///     .identity(DeviceIdentity::new([0x24, 0x0a, 0xc4, 0, 0, 1], [0x24, 0x0a, 0xc4, 0, 0, 2]))
///     .streams(StreamSelection::CsiOnly)
///     .mount_path(dir.path())
///     .on_event(|e| tracing::info!(?e, "capture event"))
///     .start(radio)
///     .await?;
///
/// session.stop().await?;
/// # Ok(())
/// # }
/// ```
///
/// [`Sniffer::builder()`]: crate::Sniffer::builder
#[must_use]
pub struct SnifferBuilder {
    config: SnifferConfig,
    identity: DeviceIdentity,
    event_callback: Option<EventCallback>,
}

impl Default for SnifferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnifferBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SnifferConfig::default(),
            identity: DeviceIdentity::default(),
            event_callback: None,
        }
    }

    /// Device MAC addresses recorded in every new log header.
    ///
    /// Default: all zero
    pub fn identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Selects which streams to capture.
    pub fn streams(mut self, streams: StreamSelection) -> Self {
        self.config.streams = streams;
        self
    }

    /// Directory the logs are written under.
    pub fn mount_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mount_path = path.into();
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include writer lifecycle, sync ticks, dropped-record reports
    /// and channel hops.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(CaptureEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom pipeline configuration.
    pub fn with_config(mut self, config: SnifferConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &SnifferConfig {
        &self.config
    }

    /// Starts capture on `radio`.
    ///
    /// Startup order: monitor mode on the start channel, a queue per enabled
    /// stream, the receive callbacks, the writer tasks, then the channel
    /// hopper. If any driver call fails, everything already started is torn
    /// down again before the error is returned.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The driver fails to enter monitor mode or install a callback
    pub async fn start(self, radio: Arc<dyn RadioDriver>) -> Result<CaptureSession, SnifferError> {
        self.config.validate()?;

        tracing::info!(
            streams = ?self.config.streams,
            mount_path = %self.config.mount_path.display(),
            channel = %self.config.start_channel,
            "starting capture pipeline"
        );

        let mut session = CaptureSession::new(Arc::clone(&radio), self.config.writer_stop_timeout);

        if let Err(err) = self.start_pipeline(&radio, &mut session) {
            tracing::error!(error = %err, "capture pipeline failed to start, rolling back");
            if let Err(teardown_err) = session.teardown().await {
                tracing::warn!(error = %teardown_err, "rollback incomplete");
            }
            return Err(err);
        }

        Ok(session)
    }

    fn start_pipeline(
        &self,
        radio: &Arc<dyn RadioDriver>,
        session: &mut CaptureSession,
    ) -> Result<(), SnifferError> {
        radio
            .start_monitor(self.config.start_channel)
            .map_err(|e| SnifferError::radio("start_monitor", e))?;
        session.monitor_started();

        let clock = CaptureClock::new(self.config.timestamps);
        let start_time = unix_time().as_secs();

        let mut frame_queue = None;
        let mut csi_queue = None;
        for stream in self.config.streams.streams() {
            let counters = session.register_stream(stream);
            let capacity = self.config.queue_capacity(stream);
            match stream {
                StreamKind::Frame => {
                    frame_queue = Some((capture_queue(capacity, Arc::clone(&counters)), counters));
                }
                StreamKind::Csi => {
                    csi_queue = Some((capture_queue(capacity, Arc::clone(&counters)), counters));
                }
            }
        }

        let frame_consumer = match frame_queue {
            Some(((producer, consumer), counters)) => {
                radio
                    .install_frame_callback(frame_callback(producer, clock))
                    .map_err(|e| SnifferError::radio("install_frame_callback", e))?;
                session.callback_installed(StreamKind::Frame);
                Some((consumer, counters))
            }
            None => None,
        };

        let csi_consumer = match csi_queue {
            Some(((producer, consumer), counters)) => {
                radio
                    .install_csi_callback(&self.config.csi, csi_callback(producer, clock))
                    .map_err(|e| SnifferError::radio("install_csi_callback", e))?;
                session.callback_installed(StreamKind::Csi);
                Some((consumer, counters))
            }
            None => None,
        };

        if let Some((consumer, counters)) = frame_consumer {
            let writer = self.writer::<FrameRecord>(start_time, counters);
            session.add_writer(WriterHandle::spawn(writer, consumer));
        }
        if let Some((consumer, counters)) = csi_consumer {
            let writer = self.writer::<CsiRecord>(start_time, counters);
            session.add_writer(WriterHandle::spawn(writer, consumer));
        }

        let hopper = ChannelHopper::new(
            Arc::clone(radio),
            self.config.start_channel,
            self.config.hop_interval,
            session.hop_counter(),
        )
        .with_event_callback(self.event_callback.clone());
        session.set_hopper(HopperHandle::spawn(hopper));

        tracing::info!(streams = ?session.enabled_streams(), "capture pipeline started");
        Ok(())
    }

    fn writer<R: LogRecord>(&self, start_time: u64, counters: Arc<StreamCounters>) -> LogWriter<R> {
        let header = FileHeader::new(R::STREAM, start_time, &self.identity);
        LogWriter::new(
            self.config.log_path(R::STREAM),
            header,
            self.config.sync_interval,
            counters,
        )
        .with_event_callback(self.event_callback.clone())
    }
}

/// Main entry point for the capture pipeline.
///
/// Use [`Sniffer::builder()`] to start configuring capture.
pub struct Sniffer;

impl Sniffer {
    /// Creates a new builder for configuring capture.
    pub fn builder() -> SnifferBuilder {
        SnifferBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockRadio, RadioOp};
    use tempfile::tempdir;

    #[test]
    fn test_builder_default() {
        let builder = SnifferBuilder::new();
        assert_eq!(builder.config().streams, StreamSelection::Both);
        assert_eq!(builder.identity, DeviceIdentity::default());
        assert!(builder.event_callback.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let builder = Sniffer::builder()
            .streams(StreamSelection::FrameOnly)
            .mount_path("/mnt/sd");
        assert_eq!(builder.config().streams, StreamSelection::FrameOnly);
        assert_eq!(
            builder.config().log_path(StreamKind::Frame),
            PathBuf::from("/mnt/sd/l2.bin")
        );
    }

    #[tokio::test]
    async fn test_invalid_config_touches_no_driver() {
        let radio = Arc::new(MockRadio::new());
        let config = SnifferConfig {
            frame_queue_capacity: 0,
            ..Default::default()
        };

        let result = Sniffer::builder().with_config(config).start(radio.clone()).await;
        assert!(matches!(result, Err(SnifferError::InvalidConfig { .. })));
        assert!(radio.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_monitor_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let radio = Arc::new(MockRadio::new());
        radio.fail_on(RadioOp::StartMonitor);

        let result = Sniffer::builder()
            .mount_path(dir.path())
            .start(radio.clone())
            .await;

        assert!(matches!(
            result,
            Err(SnifferError::Radio {
                operation: "start_monitor",
                ..
            })
        ));
        assert_eq!(radio.calls(), vec![RadioOp::StartMonitor]);
    }

    #[tokio::test]
    async fn test_install_failure_rolls_back() {
        let dir = tempdir().unwrap();
        let radio = Arc::new(MockRadio::new());
        radio.fail_on(RadioOp::InstallCsiCallback);

        let result = Sniffer::builder()
            .mount_path(dir.path())
            .start(radio.clone())
            .await;

        assert!(matches!(
            result,
            Err(SnifferError::Radio {
                operation: "install_csi_callback",
                ..
            })
        ));
        assert!(!radio.has_callback(StreamKind::Frame));
        assert!(!radio.is_monitoring());
        assert_eq!(
            radio.calls(),
            vec![
                RadioOp::StartMonitor,
                RadioOp::InstallFrameCallback,
                RadioOp::InstallCsiCallback,
                RadioOp::RemoveFrameCallback,
                RadioOp::StopMonitor,
            ]
        );
        // No writer was started, so no log was created.
        assert!(!dir.path().join("l2.bin").exists());
    }
}
