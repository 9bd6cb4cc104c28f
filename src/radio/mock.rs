//! Mock radio for testing without hardware.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::radio::{CsiCallback, FrameCallback, RadioDriver, RxCsi, RxFrame};
use crate::{Channel, CsiConfig, RadioError, StreamKind};

/// A driver operation, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioOp {
    /// [`RadioDriver::start_monitor`]
    StartMonitor,
    /// [`RadioDriver::stop_monitor`]
    StopMonitor,
    /// [`RadioDriver::set_channel`]
    SetChannel,
    /// [`RadioDriver::install_frame_callback`]
    InstallFrameCallback,
    /// [`RadioDriver::remove_frame_callback`]
    RemoveFrameCallback,
    /// [`RadioDriver::install_csi_callback`]
    InstallCsiCallback,
    /// [`RadioDriver::remove_csi_callback`]
    RemoveCsiCallback,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RadioOp>,
    failing: HashSet<RadioOp>,
    monitoring: bool,
    channel: Option<Channel>,
    channel_history: Vec<Channel>,
    frame_callback: Option<FrameCallback>,
    csi_callback: Option<CsiCallback>,
    csi_config: Option<CsiConfig>,
}

/// An in-memory [`RadioDriver`] that records every call.
///
/// Frames and CSI samples are delivered with [`inject_frame`](Self::inject_frame)
/// and [`inject_csi`](Self::inject_csi), which invoke the installed callback
/// synchronously the way a driver's receive path would. Any operation can be
/// made to fail with [`fail_on`](Self::fail_on).
///
/// # Example
///
/// ```
/// use csi_sniffer::{Channel, MockRadio, RadioDriver, RadioOp};
///
/// let radio = MockRadio::new();
/// radio.start_monitor(Channel::MIN).unwrap();
/// radio.set_channel(Channel::new(6).unwrap()).unwrap();
///
/// assert_eq!(radio.call_count(RadioOp::SetChannel), 1);
/// assert_eq!(radio.channel(), Channel::new(6));
/// ```
#[derive(Default)]
pub struct MockRadio {
    state: Mutex<MockState>,
}

impl MockRadio {
    /// Creates a mock radio with no failures configured.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent call to `op` fail.
    pub fn fail_on(&self, op: RadioOp) {
        self.state().failing.insert(op);
    }

    /// Clears a failure set with [`fail_on`](Self::fail_on).
    pub fn clear_failure(&self, op: RadioOp) {
        self.state().failing.remove(&op);
    }

    /// Number of times `op` was called, including failed calls.
    pub fn call_count(&self, op: RadioOp) -> usize {
        self.state().calls.iter().filter(|c| **c == op).count()
    }

    /// Every call in order, including failed calls.
    pub fn calls(&self) -> Vec<RadioOp> {
        self.state().calls.clone()
    }

    /// Current channel, if monitor mode was ever started.
    pub fn channel(&self) -> Option<Channel> {
        self.state().channel
    }

    /// Every channel successfully tuned by `set_channel`, in order.
    pub fn channel_history(&self) -> Vec<Channel> {
        self.state().channel_history.clone()
    }

    /// Whether monitor mode is active.
    pub fn is_monitoring(&self) -> bool {
        self.state().monitoring
    }

    /// Whether a callback is installed for `stream`.
    pub fn has_callback(&self, stream: StreamKind) -> bool {
        let state = self.state();
        match stream {
            StreamKind::Frame => state.frame_callback.is_some(),
            StreamKind::Csi => state.csi_callback.is_some(),
        }
    }

    /// CSI flags passed to the last successful `install_csi_callback`.
    pub fn csi_config(&self) -> Option<CsiConfig> {
        self.state().csi_config
    }

    /// Delivers a frame to the installed callback.
    ///
    /// Returns `false` if no frame callback is installed.
    pub fn inject_frame(&self, frame: &RxFrame<'_>) -> bool {
        match self.state().frame_callback.as_mut() {
            Some(callback) => {
                callback(frame);
                true
            }
            None => false,
        }
    }

    /// Delivers a CSI sample to the installed callback.
    ///
    /// Returns `false` if no CSI callback is installed.
    pub fn inject_csi(&self, csi: &RxCsi<'_>) -> bool {
        match self.state().csi_callback.as_mut() {
            Some(callback) => {
                callback(csi);
                true
            }
            None => false,
        }
    }

    /// Records the call and returns the injected failure, if any.
    fn enter(state: &mut MockState, op: RadioOp) -> Result<(), RadioError> {
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(RadioError::driver(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

impl RadioDriver for MockRadio {
    fn start_monitor(&self, channel: Channel) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::StartMonitor)?;
        state.monitoring = true;
        state.channel = Some(channel);
        Ok(())
    }

    fn stop_monitor(&self) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::StopMonitor)?;
        if !state.monitoring {
            return Err(RadioError::NotStarted);
        }
        state.monitoring = false;
        Ok(())
    }

    fn set_channel(&self, channel: Channel) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::SetChannel)?;
        if !state.monitoring {
            return Err(RadioError::NotStarted);
        }
        state.channel = Some(channel);
        state.channel_history.push(channel);
        Ok(())
    }

    fn install_frame_callback(&self, callback: FrameCallback) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::InstallFrameCallback)?;
        if !state.monitoring {
            return Err(RadioError::NotStarted);
        }
        if state.frame_callback.is_some() {
            return Err(RadioError::AlreadyInstalled(StreamKind::Frame));
        }
        state.frame_callback = Some(callback);
        Ok(())
    }

    fn remove_frame_callback(&self) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::RemoveFrameCallback)?;
        state.frame_callback = None;
        Ok(())
    }

    fn install_csi_callback(
        &self,
        config: &CsiConfig,
        callback: CsiCallback,
    ) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::InstallCsiCallback)?;
        if !state.monitoring {
            return Err(RadioError::NotStarted);
        }
        if state.csi_callback.is_some() {
            return Err(RadioError::AlreadyInstalled(StreamKind::Csi));
        }
        state.csi_config = Some(*config);
        state.csi_callback = Some(callback);
        Ok(())
    }

    fn remove_csi_callback(&self) -> Result<(), RadioError> {
        let mut state = self.state();
        Self::enter(&mut state, RadioOp::RemoveCsiCallback)?;
        state.csi_callback = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MacAddress;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inject_without_callback_is_not_delivered() {
        let radio = MockRadio::new();
        let frame = RxFrame {
            payload: &[0x80],
            sig_len: 1,
            rssi: -40,
            channel: 1,
        };
        assert!(!radio.inject_frame(&frame));
    }

    #[test]
    fn test_installed_callback_receives_frames() {
        let radio = MockRadio::new();
        radio.start_monitor(Channel::MIN).unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        radio
            .install_frame_callback(Box::new(move |frame| {
                seen_cb.fetch_add(frame.payload.len(), Ordering::SeqCst);
            }))
            .unwrap();

        let frame = RxFrame {
            payload: &[0x80, 0, 0],
            sig_len: 3,
            rssi: -40,
            channel: 1,
        };
        assert!(radio.inject_frame(&frame));
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        radio.remove_frame_callback().unwrap();
        assert!(!radio.inject_frame(&frame));
    }

    #[test]
    fn test_csi_install_records_config() {
        let radio = MockRadio::new();
        radio.start_monitor(Channel::MIN).unwrap();
        radio
            .install_csi_callback(&CsiConfig::default(), Box::new(|_| {}))
            .unwrap();

        assert_eq!(radio.csi_config(), Some(CsiConfig::default()));
        assert!(radio.has_callback(StreamKind::Csi));
        assert!(radio.inject_csi(&RxCsi {
            mac: MacAddress::UNSPECIFIED,
            rssi: -50,
            channel: 1,
            data: &[1, 2],
        }));
    }

    #[test]
    fn test_double_install_rejected() {
        let radio = MockRadio::new();
        radio.start_monitor(Channel::MIN).unwrap();
        radio.install_frame_callback(Box::new(|_| {})).unwrap();
        assert_eq!(
            radio.install_frame_callback(Box::new(|_| {})),
            Err(RadioError::AlreadyInstalled(StreamKind::Frame))
        );
    }

    #[test]
    fn test_set_channel_requires_monitor_mode() {
        let radio = MockRadio::new();
        assert_eq!(
            radio.set_channel(Channel::MAX),
            Err(RadioError::NotStarted)
        );
    }

    #[test]
    fn test_injected_failure_is_counted() {
        let radio = MockRadio::new();
        radio.fail_on(RadioOp::StartMonitor);

        assert!(radio.start_monitor(Channel::MIN).is_err());
        assert_eq!(radio.call_count(RadioOp::StartMonitor), 1);
        assert!(!radio.is_monitoring());

        radio.clear_failure(RadioOp::StartMonitor);
        assert!(radio.start_monitor(Channel::MIN).is_ok());
    }
}
