//! Radio driver abstraction.
//!
//! The pipeline depends on the radio only through [`RadioDriver`]: monitor
//! mode on/off, channel selection, and registration of the two receive
//! callbacks. Callbacks are invoked from the driver's receive context with
//! buffers that are only valid for the duration of the call.

mod mock;

pub use mock::{MockRadio, RadioOp};

use crate::{Channel, CsiConfig, MacAddress, RadioError};

/// A frame delivered by the driver in promiscuous mode.
///
/// Borrowed from a driver-owned buffer that is invalidated as soon as the
/// callback returns.
#[derive(Debug, Clone, Copy)]
pub struct RxFrame<'a> {
    /// Raw MAC frame, starting at the frame control field.
    pub payload: &'a [u8],
    /// Length reported by the radio (may exceed `payload.len()`).
    pub sig_len: usize,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Channel the frame was received on.
    pub channel: u8,
}

/// A CSI sample delivered by the driver.
///
/// Borrowed from a driver-owned buffer that is invalidated as soon as the
/// callback returns.
#[derive(Debug, Clone, Copy)]
pub struct RxCsi<'a> {
    /// Transmitter address of the frame that produced the sample.
    pub mac: MacAddress,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Channel the sample was taken on.
    pub channel: u8,
    /// Raw CSI bytes.
    pub data: &'a [u8],
}

/// Frame receive callback. Runs in the driver's receive context.
pub type FrameCallback = Box<dyn FnMut(&RxFrame<'_>) + Send + 'static>;

/// CSI receive callback. Runs in the driver's receive context.
pub type CsiCallback = Box<dyn FnMut(&RxCsi<'_>) + Send + 'static>;

/// The radio operations the capture pipeline needs.
///
/// All methods are synchronous and report success or failure immediately.
/// Methods take `&self`; implementations use interior mutability so the
/// driver can be shared between the supervisor and the channel hopper.
///
/// Installed callbacks must never be invoked concurrently with themselves,
/// and must not be invoked again after the matching `remove_*` returns.
pub trait RadioDriver: Send + Sync {
    /// Brings the radio up in receive-only monitor mode on `channel`.
    fn start_monitor(&self, channel: Channel) -> Result<(), RadioError>;

    /// Leaves monitor mode and stops the radio.
    fn stop_monitor(&self) -> Result<(), RadioError>;

    /// Retunes the receiver.
    fn set_channel(&self, channel: Channel) -> Result<(), RadioError>;

    /// Registers the frame callback and enables promiscuous receive.
    fn install_frame_callback(&self, callback: FrameCallback) -> Result<(), RadioError>;

    /// Disables promiscuous receive and drops the frame callback.
    fn remove_frame_callback(&self) -> Result<(), RadioError>;

    /// Applies `config`, registers the CSI callback and enables CSI.
    fn install_csi_callback(
        &self,
        config: &CsiConfig,
        callback: CsiCallback,
    ) -> Result<(), RadioError>;

    /// Disables CSI and drops the CSI callback.
    fn remove_csi_callback(&self) -> Result<(), RadioError>;
}
