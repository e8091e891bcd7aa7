//! Active discovery: ARP sweep of the local subnet.
//!
//! A listener thread reads ARP replies from a second capture handle while
//! the sweep paces one broadcast request per target every 10 ms. The
//! whole operation honors both its own deadline and the shared
//! cancellation token. Individual send failures are logged and skipped.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ipnetwork::Ipv4Network;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::capture::arp::{self, ArpOp};
use crate::capture::packet::{MacAddr, PacketView};
use crate::discovery::device::DiscoverySource;
use crate::discovery::DeviceRegistry;
use crate::error::{Result, SensorError};
use crate::oui::OuiDb;

/// Hard cap on targets per sweep, regardless of subnet size.
const MAX_SWEEP_HOSTS: u32 = 1024;
/// Pause between probes so the sweep stays polite.
const PROBE_INTERVAL: Duration = Duration::from_millis(10);
/// Grace period for trailing replies after the last probe.
const REPLY_DRAIN: Duration = Duration::from_secs(2);
/// Listener poll granularity.
const LISTEN_TIMEOUT_MS: i32 = 100;

pub struct ActiveDiscovery {
    registry: Arc<DeviceRegistry>,
    oui: Arc<OuiDb>,
    iface: String,
    local_mac: MacAddr,
    local_ip: Ipv4Addr,
    subnet: Ipv4Network,
}

impl ActiveDiscovery {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        oui: Arc<OuiDb>,
        iface: impl Into<String>,
        local_mac: MacAddr,
        local_ip: Ipv4Addr,
        subnet: Ipv4Network,
    ) -> Self {
        Self {
            registry,
            oui,
            iface: iface.into(),
            local_mac,
            local_ip,
            subnet,
        }
    }

    /// Run the sweep. Blocking; call from a dedicated thread.
    pub fn run(&self, cancel: &CancellationToken, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let stop = Arc::new(AtomicBool::new(false));

        let listener = self.spawn_reply_listener(cancel.clone(), stop.clone());

        let mut sender = pcap::Capture::from_device(self.iface.as_str())
            .map_err(|e| SensorError::CaptureOpen {
                iface: self.iface.clone(),
                source: e,
            })?
            .promisc(false)
            .snaplen(128)
            .open()
            .map_err(|e| SensorError::CaptureOpen {
                iface: self.iface.clone(),
                source: e,
            })?;

        let targets = self.enumerate_targets();
        debug!(
            subnet = %self.subnet,
            targets = targets.len(),
            "starting ARP sweep"
        );

        for target in targets {
            if cancel.is_cancelled() || Instant::now() >= deadline {
                break;
            }
            let frame = arp::build_request(self.local_mac, self.local_ip, target);
            if let Err(e) = sender.sendpacket(&frame[..]) {
                warn!(%target, error = %e, "ARP probe send failed");
                continue;
            }
            thread::sleep(PROBE_INTERVAL);
        }

        // Let stragglers answer before tearing the listener down.
        let drain_until = Instant::now() + REPLY_DRAIN;
        while Instant::now() < drain_until && Instant::now() < deadline && !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(50));
        }

        stop.store(true, Ordering::SeqCst);
        if let Err(e) = listener.join() {
            warn!("ARP reply listener thread panicked: {:?}", e);
        }
        Ok(())
    }

    fn spawn_reply_listener(
        &self,
        cancel: CancellationToken,
        stop: Arc<AtomicBool>,
    ) -> thread::JoinHandle<()> {
        let iface = self.iface.clone();
        let registry = self.registry.clone();
        let oui = self.oui.clone();

        thread::spawn(move || {
            let capture = pcap::Capture::from_device(iface.as_str())
                .and_then(|c| c.promisc(true).snaplen(128).timeout(LISTEN_TIMEOUT_MS).open());
            let mut capture = match capture {
                Ok(c) => c,
                Err(e) => {
                    warn!(%iface, error = %e, "could not open ARP reply listener");
                    return;
                }
            };
            if let Err(e) = capture.filter("arp", true) {
                warn!(%iface, error = %e, "could not set ARP filter");
            }

            while !stop.load(Ordering::SeqCst) && !cancel.is_cancelled() {
                match capture.next_packet() {
                    Ok(captured) => record_reply(&registry, &oui, captured.data),
                    Err(pcap::Error::TimeoutExpired) => {}
                    Err(_) => return,
                }
            }
        })
    }

    /// All probe targets in the subnet: network and broadcast addresses
    /// are skipped, the host count is capped, and our own address is
    /// left out.
    pub fn enumerate_targets(&self) -> Vec<Ipv4Addr> {
        let base = u32::from(self.subnet.network());
        let host_count = self.subnet.size().min(MAX_SWEEP_HOSTS);

        let mut targets = Vec::new();
        for offset in 1..host_count.saturating_sub(1) {
            let addr = Ipv4Addr::from(base.wrapping_add(offset));
            if addr == self.local_ip {
                continue;
            }
            targets.push(addr);
        }
        targets
    }
}

fn record_reply(registry: &DeviceRegistry, oui: &OuiDb, data: &[u8]) {
    let view = PacketView::new(data);
    let Some(arp) = view.arp() else {
        return;
    };
    if arp.operation != ArpOp::Reply {
        return;
    }
    let mac = arp.sender_mac;
    if mac.is_zero() || mac.is_multicast() || arp.sender_ip.is_unspecified() {
        return;
    }
    registry.upsert(mac, |device| {
        device.add_ip(arp.sender_ip.into());
        device.source = DiscoverySource::ActiveArp;
        device.set_vendor_if_empty(oui.vendor(&mac.to_string()));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(subnet: &str, local_ip: &str) -> ActiveDiscovery {
        ActiveDiscovery::new(
            Arc::new(DeviceRegistry::new()),
            Arc::new(OuiDb::new()),
            "test0",
            "66:77:88:99:aa:bb".parse().unwrap(),
            local_ip.parse().unwrap(),
            subnet.parse().unwrap(),
        )
    }

    #[test]
    fn test_enumerate_slash24() {
        let targets = sweep("192.168.1.0/24", "192.168.1.10").enumerate_targets();
        // 254 hosts minus ourselves
        assert_eq!(targets.len(), 253);
        assert!(!targets.contains(&Ipv4Addr::new(192, 168, 1, 0)));
        assert!(!targets.contains(&Ipv4Addr::new(192, 168, 1, 255)));
        assert!(!targets.contains(&Ipv4Addr::new(192, 168, 1, 10)));
        assert!(targets.contains(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(targets.contains(&Ipv4Addr::new(192, 168, 1, 254)));
    }

    #[test]
    fn test_enumerate_caps_large_subnets() {
        let targets = sweep("10.0.0.0/16", "10.0.0.10").enumerate_targets();
        assert!(targets.len() <= MAX_SWEEP_HOSTS as usize);
    }

    #[test]
    fn test_enumerate_slash22_stays_within_cap() {
        let targets = sweep("10.1.0.0/22", "10.1.0.10").enumerate_targets();
        // 1024 addresses minus network, last-enumerable, and ourselves
        assert!(targets.len() <= 1024);
        assert!(targets.len() >= 1000);
        assert!(targets.contains(&Ipv4Addr::new(10, 1, 1, 0)));
    }

    #[test]
    fn test_record_reply_tags_source() {
        let registry = Arc::new(DeviceRegistry::new());
        let oui = Arc::new(OuiDb::new());
        let mac: MacAddr = "aa:bb:cc:11:22:33".parse().unwrap();

        // Reply frame: ethernet + ARP with op 2
        let mut frame = arp::build_request(
            mac,
            Ipv4Addr::new(192, 168, 1, 42),
            Ipv4Addr::new(192, 168, 1, 10),
        );
        frame[21] = 2; // op: reply

        record_reply(&registry, &oui, &frame);
        let device = registry.get(mac).unwrap();
        assert_eq!(device.source, DiscoverySource::ActiveArp);
        assert!(device.ips.contains(&"192.168.1.42".parse().unwrap()));
    }

    #[test]
    fn test_record_reply_ignores_requests() {
        let registry = Arc::new(DeviceRegistry::new());
        let oui = Arc::new(OuiDb::new());
        let frame = arp::build_request(
            "aa:bb:cc:11:22:33".parse().unwrap(),
            Ipv4Addr::new(192, 168, 1, 42),
            Ipv4Addr::new(192, 168, 1, 10),
        );
        record_reply(&registry, &oui, &frame);
        assert_eq!(registry.count(), 0);
    }
}
