//! Channel hopper task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::event::{emit, EventCallback};
use crate::radio::RadioDriver;
use crate::{CaptureEvent, Channel};

/// Command sent to the hopper task.
#[derive(Debug)]
pub(crate) enum HopperCommand {
    /// Stop hopping and exit.
    Stop,
}

/// Walks the receiver through channels 1..=13 at a fixed dwell time.
///
/// Has no link to the capture queues; it only retunes the radio.
pub(crate) struct ChannelHopper {
    radio: Arc<dyn RadioDriver>,
    current: Channel,
    interval: Duration,
    hops: Arc<AtomicU64>,
    event_callback: Option<EventCallback>,
}

impl ChannelHopper {
    pub fn new(
        radio: Arc<dyn RadioDriver>,
        start: Channel,
        interval: Duration,
        hops: Arc<AtomicU64>,
    ) -> Self {
        Self {
            radio,
            current: start,
            interval,
            hops,
            event_callback: None,
        }
    }

    pub fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    /// Advances to the next channel.
    fn hop(&mut self) -> Result<(), crate::RadioError> {
        let next = self.current.next();
        self.radio.set_channel(next)?;
        self.current = next;
        self.hops.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(channel = %next, "channel hopped");
        emit(
            self.event_callback.as_ref(),
            CaptureEvent::ChannelHopped { channel: next },
        );
        Ok(())
    }

    /// Hops every interval until stopped.
    ///
    /// A driver failure ends the hopper; capture continues on the current
    /// channel.
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<HopperCommand>) {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(channel = %self.current, interval = ?self.interval, "channel hopper started");
        loop {
            tokio::select! {
                biased;
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(HopperCommand::Stop) | None => break,
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.hop() {
                        tracing::error!(channel = %self.current, error = %e, "set_channel failed, hopper stopping");
                        emit(
                            self.event_callback.as_ref(),
                            CaptureEvent::HopperStopped {
                                reason: format!("set_channel({}) failed: {e}", self.current.next()),
                            },
                        );
                        return;
                    }
                }
            }
        }
        tracing::debug!(channel = %self.current, "channel hopper stopped");
    }
}

/// Handle to the running hopper task.
pub(crate) struct HopperHandle {
    cmd_tx: mpsc::Sender<HopperCommand>,
    handle: JoinHandle<()>,
}

impl HopperHandle {
    pub fn spawn(hopper: ChannelHopper) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let handle = tokio::spawn(hopper.run(cmd_rx));
        Self { cmd_tx, handle }
    }

    /// Stops the hopper, aborting it if it does not exit within `timeout`.
    pub async fn stop(mut self, timeout: Duration) {
        let _ = self.cmd_tx.try_send(HopperCommand::Stop);
        if tokio::time::timeout(timeout, &mut self.handle).await.is_err() {
            tracing::warn!("channel hopper did not stop in time, aborting");
            self.handle.abort();
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockRadio, RadioOp};
    use std::sync::Mutex;

    fn started_radio(channel: Channel) -> Arc<MockRadio> {
        let radio = Arc::new(MockRadio::new());
        radio.start_monitor(channel).unwrap();
        radio
    }

    #[tokio::test(start_paused = true)]
    async fn test_hops_wrap_from_thirteen_to_one() {
        let radio = started_radio(Channel::new(12).unwrap());
        let hops = Arc::new(AtomicU64::new(0));
        let hopper = ChannelHopper::new(
            radio.clone(),
            Channel::new(12).unwrap(),
            Duration::from_secs(1),
            Arc::clone(&hops),
        );

        let handle = HopperHandle::spawn(hopper);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        handle.stop(Duration::from_secs(1)).await;

        let visited: Vec<u8> = radio.channel_history().iter().map(Channel::get).collect();
        assert_eq!(visited, vec![13, 1, 2]);
        assert_eq!(hops.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_hop_before_first_interval() {
        let radio = started_radio(Channel::MIN);
        let hopper = ChannelHopper::new(
            radio.clone(),
            Channel::MIN,
            Duration::from_secs(1),
            Arc::new(AtomicU64::new(0)),
        );

        let handle = HopperHandle::spawn(hopper);
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.stop(Duration::from_secs(1)).await;

        assert_eq!(radio.call_count(RadioOp::SetChannel), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_failure_stops_hopper() {
        let radio = started_radio(Channel::MIN);
        radio.fail_on(RadioOp::SetChannel);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let hopper = ChannelHopper::new(
            radio.clone(),
            Channel::MIN,
            Duration::from_secs(1),
            Arc::new(AtomicU64::new(0)),
        )
        .with_event_callback(Some(crate::event_callback(move |e| {
            sink.lock().unwrap().push(e);
        })));

        let handle = HopperHandle::spawn(hopper);
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.stop(Duration::from_secs(1)).await;

        assert_eq!(radio.call_count(RadioOp::SetChannel), 1);
        let events = events.lock().unwrap();
        assert!(matches!(
            events.as_slice(),
            [CaptureEvent::HopperStopped { .. }]
        ));
    }
}
