//! Configuration types for the capture pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Channel, SnifferError, StreamKind, StreamSelection};

/// How capture timestamps are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSource {
    /// Microseconds since the pipeline started (monotonic).
    #[default]
    Monotonic,
    /// Milliseconds since the Unix epoch, from the synchronized system clock.
    WallClock,
}

/// CSI collection flags passed to the driver when the CSI stream is enabled.
///
/// The defaults collect every long-training-field variant and merge them,
/// with no driver-side filtering or scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiConfig {
    /// Legacy long training field.
    pub lltf: bool,
    /// HT long training field.
    pub htltf: bool,
    /// STBC HT-LTF2.
    pub stbc_htltf2: bool,
    /// Merge LTF fields into one sample.
    pub ltf_merge: bool,
    /// Driver-side channel smoothing filter.
    pub channel_filter: bool,
    /// Use `shift` instead of automatic scaling.
    pub manual_scale: bool,
    /// Manual left shift applied when `manual_scale` is set.
    pub shift: u8,
}

impl Default for CsiConfig {
    fn default() -> Self {
        Self {
            lltf: true,
            htltf: true,
            stbc_htltf2: true,
            ltf_merge: true,
            channel_filter: false,
            manual_scale: false,
            shift: 0,
        }
    }
}

/// Configuration for the capture pipeline.
///
/// Use [`SnifferConfig::default()`] for the deployed defaults, or customize
/// as needed.
///
/// # Example
///
/// ```
/// use csi_sniffer::{SnifferConfig, StreamSelection};
/// use std::time::Duration;
///
/// let config = SnifferConfig {
///     streams: StreamSelection::CsiOnly,
///     hop_interval: Duration::from_millis(500),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SnifferConfig {
    /// Which streams to capture.
    ///
    /// Default: both
    pub streams: StreamSelection,

    /// Capacity of the frame queue, in records.
    ///
    /// When full, newly received frames are dropped and counted.
    /// Default: 100
    pub frame_queue_capacity: usize,

    /// Capacity of the CSI queue, in records.
    ///
    /// Default: 100
    pub csi_queue_capacity: usize,

    /// Interval between durability syncs of each open log.
    ///
    /// Bounds data loss on power failure. Default: 5 seconds
    pub sync_interval: Duration,

    /// Dwell time on each channel before hopping.
    ///
    /// Default: 1 second
    pub hop_interval: Duration,

    /// Channel the radio is tuned to when monitor mode starts.
    ///
    /// Default: 1
    pub start_channel: Channel,

    /// Directory where the removable storage is mounted.
    ///
    /// Default: `/sdcard`
    pub mount_path: PathBuf,

    /// File name of the frame log under `mount_path`.
    ///
    /// Default: `l2.bin`
    pub frame_file_name: String,

    /// File name of the CSI log under `mount_path`.
    ///
    /// Default: `csi.bin`
    pub csi_file_name: String,

    /// Record timestamp source.
    ///
    /// Default: monotonic
    pub timestamps: TimestampSource,

    /// CSI collection flags.
    pub csi: CsiConfig,

    /// How long teardown waits for each writer to close its file before
    /// aborting it.
    ///
    /// Default: 2 seconds
    pub writer_stop_timeout: Duration,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            streams: StreamSelection::Both,
            frame_queue_capacity: 100,
            csi_queue_capacity: 100,
            sync_interval: Duration::from_secs(5),
            hop_interval: Duration::from_secs(1),
            start_channel: Channel::MIN,
            mount_path: PathBuf::from("/sdcard"),
            frame_file_name: "l2.bin".to_string(),
            csi_file_name: "csi.bin".to_string(),
            timestamps: TimestampSource::Monotonic,
            csi: CsiConfig::default(),
            writer_stop_timeout: Duration::from_secs(2),
        }
    }
}

impl SnifferConfig {
    /// Full path of the log file for `stream`.
    pub fn log_path(&self, stream: StreamKind) -> PathBuf {
        match stream {
            StreamKind::Frame => self.mount_path.join(&self.frame_file_name),
            StreamKind::Csi => self.mount_path.join(&self.csi_file_name),
        }
    }

    /// Queue capacity for `stream`.
    pub fn queue_capacity(&self, stream: StreamKind) -> usize {
        match stream {
            StreamKind::Frame => self.frame_queue_capacity,
            StreamKind::Csi => self.csi_queue_capacity,
        }
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), SnifferError> {
        for stream in self.streams.streams() {
            if self.queue_capacity(stream) == 0 {
                return Err(SnifferError::invalid_config(format!(
                    "{stream} queue capacity must be non-zero"
                )));
            }
        }
        if self.sync_interval.is_zero() {
            return Err(SnifferError::invalid_config(
                "sync interval must be non-zero",
            ));
        }
        if self.hop_interval.is_zero() {
            return Err(SnifferError::invalid_config("hop interval must be non-zero"));
        }
        if self.frame_file_name.is_empty() || self.csi_file_name.is_empty() {
            return Err(SnifferError::invalid_config("log file names must be non-empty"));
        }
        if self.frame_file_name == self.csi_file_name {
            return Err(SnifferError::invalid_config(
                "frame and CSI logs must use different files",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniffer_config_defaults() {
        let config = SnifferConfig::default();
        assert_eq!(config.streams, StreamSelection::Both);
        assert_eq!(config.frame_queue_capacity, 100);
        assert_eq!(config.csi_queue_capacity, 100);
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.hop_interval, Duration::from_secs(1));
        assert_eq!(config.start_channel.get(), 1);
        assert_eq!(config.timestamps, TimestampSource::Monotonic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_paths() {
        let config = SnifferConfig::default();
        assert_eq!(
            config.log_path(StreamKind::Frame),
            PathBuf::from("/sdcard/l2.bin")
        );
        assert_eq!(
            config.log_path(StreamKind::Csi),
            PathBuf::from("/sdcard/csi.bin")
        );
    }

    #[test]
    fn test_zero_capacity_rejected_only_for_enabled_stream() {
        let config = SnifferConfig {
            streams: StreamSelection::FrameOnly,
            csi_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = SnifferConfig {
            streams: StreamSelection::CsiOnly,
            csi_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SnifferError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let config = SnifferConfig {
            sync_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SnifferConfig {
            hop_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_file_name_rejected() {
        let config = SnifferConfig {
            csi_file_name: "l2.bin".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_csi_config_defaults() {
        let csi = CsiConfig::default();
        assert!(csi.lltf && csi.htltf && csi.stbc_htltf2 && csi.ltf_merge);
        assert!(!csi.channel_filter);
        assert!(!csi.manual_scale);
    }
}
