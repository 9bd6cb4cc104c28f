//! Capture pipeline components.
//!
//! Each enabled stream gets its own queue, callback and writer:
//!
//! ```text
//! Radio RX ─▶ Capture Callback ─▶ Bounded Queue ─▶ Writer Task ─▶ log file
//! ```
//!
//! - **Capture Callback**: copies the driver buffer into a fixed-size record
//! - **Bounded Queue**: pre-allocated SPSC ring; full means drop and count
//! - **Writer Task**: appends records, flushes each one, fsyncs on a timer
//! - **Channel Hopper**: retunes the radio on its own timer
//!
//! The callbacks never block, so capture is never held up by slow storage.

mod capture;
mod hopper;
mod queue;
mod writer;

pub(crate) use capture::{csi_callback, frame_callback, unix_time, CaptureClock};
pub(crate) use hopper::{ChannelHopper, HopperHandle};
pub(crate) use queue::capture_queue;
pub(crate) use writer::{LogWriter, WriterHandle};
