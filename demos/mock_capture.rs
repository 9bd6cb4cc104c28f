//! Mock capture example.
//!
//! Runs the full pipeline against `MockRadio`, feeding it synthetic beacons,
//! data frames and CSI samples, then reads the logs back.
//!
//! Run with: cargo run --example mock_capture
//! Set RUST_LOG=csi_sniffer=debug for writer and sync logs.

use std::sync::Arc;
use std::time::Duration;

use csi_sniffer::{
    CsiRecord, DeviceIdentity, FrameRecord, LogReader, MacAddress, MockRadio, RxCsi, RxFrame,
    Sniffer, SnifferConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("csi_sniffer=info")),
        )
        .init();

    let dir = tempfile::tempdir()?;
    let radio = Arc::new(MockRadio::new());
    let identity = DeviceIdentity::new(
        "24:0a:c4:12:34:56".parse::<MacAddress>()?,
        "24:0a:c4:12:34:58".parse::<MacAddress>()?,
    );

    let session = Sniffer::builder()
        .identity(identity)
        .with_config(SnifferConfig {
            mount_path: dir.path().to_path_buf(),
            sync_interval: Duration::from_millis(500),
            hop_interval: Duration::from_millis(100),
            ..Default::default()
        })
        .on_event(|event| tracing::info!(?event, "capture event"))
        .start(radio.clone())
        .await?;

    println!("Capturing for 2 seconds...");
    let mut beacon = [0u8; 120];
    beacon[0] = 0x80;
    let mut data = [0u8; 1500];
    data[0] = 0x08;
    let csi = [7u8; 384];

    for i in 0u8..200 {
        let channel = radio.channel().map_or(1, |c| c.get());
        radio.inject_frame(&RxFrame {
            payload: if i % 4 == 0 { &beacon } else { &data },
            sig_len: if i % 4 == 0 { beacon.len() } else { data.len() },
            rssi: -40 - (i % 40) as i8,
            channel,
        });
        radio.inject_csi(&RxCsi {
            mac: MacAddress::new([0x02, 0, 0, 0, 0, i]),
            rssi: -50,
            channel,
            data: &csi,
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    println!("Stats: {:?}", session.stats());
    session.stop().await?;

    let frames = LogReader::<FrameRecord>::open(dir.path().join("l2.bin"))?;
    println!(
        "l2.bin: {} frames, device {}",
        frames.record_count(),
        frames.header().wifi_mac
    );
    let csi = LogReader::<CsiRecord>::open(dir.path().join("csi.bin"))?;
    println!("csi.bin: {} samples", csi.record_count());

    Ok(())
}
