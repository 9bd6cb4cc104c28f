//! # csi-sniffer
//!
//! Capture-to-storage pipeline for 802.11 frame headers and Channel State
//! Information (CSI).
//!
//! `csi-sniffer` puts a radio into monitor mode, copies every received frame
//! header and CSI sample into a fixed-size record from the driver's receive
//! callback, and appends the records to per-stream binary logs on removable
//! storage. A channel hopper spreads receive time across channels 1 to 13.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use csi_sniffer::{DeviceIdentity, Sniffer, SnifferConfig};
//!
//! let radio: Arc<dyn csi_sniffer::RadioDriver> = Arc::new(MyDriver::new());
//!
//! let session = Sniffer::builder()
//!     .identity(DeviceIdentity::new(wifi_mac, bt_mac))
//!     .with_config(SnifferConfig::default())      // /sdcard/l2.bin + /sdcard/csi.bin
//!     .on_event(|e| tracing::warn!(?e, "capture event"))
//!     .start(radio)
//!     .await?;
//!
//! tokio::time::sleep(capture_phase).await;
//! session.stop().await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict boundary between the driver's receive
//! context and task context:
//!
//! - **Receive callbacks**: copy into a fixed-size record and try to enqueue;
//!   never block, allocate, log or touch the filesystem
//! - **Bounded queues**: pre-allocated SPSC rings; a full queue drops the new
//!   record and counts it
//! - **Tokio runtime**: one writer task per stream plus the channel hopper
//!
//! ## Log format
//!
//! Each log is a 28-byte [`FileHeader`] followed by fixed-width records
//! ([`FrameRecord`] or [`CsiRecord`]), all little-endian. Use [`LogReader`]
//! to read them back.

#![warn(missing_docs)]
// Record fields are fixed-width on disk; lengths are bounded by capacity.
#![allow(clippy::cast_possible_truncation)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod channel;
mod config;
mod error;
mod event;
mod identity;
mod pipeline;
pub mod radio;
pub mod record;
mod session;
mod stats;
mod stream;

pub use builder::{Sniffer, SnifferBuilder};
pub use channel::Channel;
pub use config::{CsiConfig, SnifferConfig, TimestampSource};
pub use error::{RadioError, SnifferError, WriterError};
pub use event::{event_callback, CaptureEvent, EventCallback};
pub use identity::{DeviceIdentity, MacAddress, ParseMacError};
pub use radio::{MockRadio, RadioDriver, RadioOp, RxCsi, RxFrame};
pub use record::{
    CsiRecord, FileHeader, FrameClass, FrameRecord, HeaderError, LogReader, LogRecord, ReadError,
    CSI_CAPACITY, HEADER_CAPACITY, PAYLOAD_CAPACITY,
};
pub use session::{CaptureSession, SessionStats};
pub use stats::StreamStats;
pub use stream::{StreamKind, StreamSelection};
