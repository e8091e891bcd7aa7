//! Live packet capture and handler fan-out.
//!
//! One producer thread drives the pcap read loop and dispatches every
//! frame synchronously to the registered handlers, in registration order.
//! Handlers therefore run on the capture thread and must keep their hot
//! path short, guarding shared state with their own locks.

pub mod arp;
pub mod dhcp;
pub mod dns;
pub mod packet;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::CaptureSettings;
use crate::error::{Result, SensorError};

pub use packet::{MacAddr, PacketView, ProtocolLabel, Transport};

/// A packet consumer attached to the capture engine.
///
/// `process` is invoked on the capture thread for every frame; failures
/// must stay internal (log and move on), never panic across this boundary.
pub trait PacketSink: Send + Sync {
    fn process(&self, packet: &PacketView<'_>);
}

/// Live capture engine for one interface.
pub struct Engine {
    iface: String,
    settings: CaptureSettings,
    handlers: RwLock<Vec<Arc<dyn PacketSink>>>,
    packet_count: AtomicU64,
}

impl Engine {
    pub fn new(iface: impl Into<String>, settings: CaptureSettings) -> Self {
        Self {
            iface: iface.into(),
            settings,
            handlers: RwLock::new(Vec::new()),
            packet_count: AtomicU64::new(0),
        }
    }

    pub fn add_handler(&self, sink: Arc<dyn PacketSink>) {
        self.handlers.write().push(sink);
    }

    /// Packets seen by the engine, counted before dispatch.
    pub fn packet_count(&self) -> u64 {
        self.packet_count.load(Ordering::Relaxed)
    }

    pub fn interface(&self) -> &str {
        &self.iface
    }

    /// Run the capture loop until `duration` elapses or `cancel` fires.
    ///
    /// Blocking; run on a dedicated thread. Both deadline expiry and
    /// cancellation are clean returns. Only the initial open can fail.
    pub fn start(&self, cancel: &CancellationToken, duration: Duration) -> Result<()> {
        let mut cap = pcap::Capture::from_device(self.iface.as_str())
            .map_err(|e| SensorError::CaptureOpen {
                iface: self.iface.clone(),
                source: e,
            })?
            .promisc(self.settings.promiscuous)
            .snaplen(self.settings.snap_len)
            .timeout(self.settings.read_timeout_ms)
            .open()
            .map_err(|e| SensorError::CaptureOpen {
                iface: self.iface.clone(),
                source: e,
            })?;

        debug!(iface = %self.iface, ?duration, "capture loop started");
        let deadline = Instant::now() + duration;

        loop {
            if cancel.is_cancelled() {
                debug!(iface = %self.iface, "capture cancelled");
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!(iface = %self.iface, "capture deadline reached");
                return Ok(());
            }

            match cap.next_packet() {
                Ok(captured) => {
                    self.packet_count.fetch_add(1, Ordering::Relaxed);
                    self.dispatch(captured.data);
                }
                // The read timeout bounds how long cancellation can go
                // unnoticed; just poll again.
                Err(pcap::Error::TimeoutExpired) => {}
                Err(pcap::Error::NoMorePackets) => return Ok(()),
                Err(e) => {
                    warn!(iface = %self.iface, error = %e, "capture read failed; ending capture");
                    return Ok(());
                }
            }
        }
    }

    fn dispatch(&self, data: &[u8]) {
        let view = PacketView::new(data);
        let handlers = self.handlers.read();
        for handler in handlers.iter() {
            // A misbehaving handler must not take the capture loop down.
            if panic::catch_unwind(AssertUnwindSafe(|| handler.process(&view))).is_err() {
                warn!("packet handler panicked; packet skipped for this handler");
            }
        }
    }
}
