//! OS fingerprinting from passive protocol signals.
//!
//! Signals accumulate per source MAC during capture and are resolved into
//! a single guess per device once capture ends: per-OS weights are summed
//! (Unknown contributes nothing) and the winner's share becomes the
//! confidence, capped at 0.95. A lone strong signal keeps its own weight
//! as confidence rather than jumping to the cap.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::capture::packet::{MacAddr, PacketView, Transport};
use crate::capture::PacketSink;
use crate::discovery::DeviceRegistry;

/// Closed set of OS labels a signal can imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsLabel {
    Windows,
    MacOs,
    Ios,
    Linux,
    Unknown,
}

impl OsLabel {
    pub fn is_known(&self) -> bool {
        !matches!(self, OsLabel::Unknown)
    }
}

impl fmt::Display for OsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OsLabel::Windows => "Windows",
            OsLabel::MacOs => "macOS",
            OsLabel::Ios => "iOS",
            OsLabel::Linux => "Linux",
            OsLabel::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// The protocol a signal was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Mdns,
    Llmnr,
    Nbns,
    Dhcp,
    Ttl,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Mdns => "mDNS",
            SignalKind::Llmnr => "LLMNR",
            SignalKind::Nbns => "NBNS",
            SignalKind::Dhcp => "DHCP",
            SignalKind::Ttl => "TTL",
        };
        write!(f, "{}", s)
    }
}

/// One fingerprinting observation.
#[derive(Debug, Clone)]
pub struct Signal {
    pub kind: SignalKind,
    pub detail: String,
    /// Evidential strength in (0, 1].
    pub weight: f64,
    pub os: OsLabel,
}

impl Signal {
    fn new(kind: SignalKind, detail: impl Into<String>, weight: f64, os: OsLabel) -> Self {
        Self {
            kind,
            detail: detail.into(),
            weight,
            os,
        }
    }

    /// `type:detail` form used in the summary output.
    pub fn tag(&self) -> String {
        format!("{}:{}", self.kind, self.detail)
    }
}

/// mDNS service questions with a known OS association, checked in order.
const MDNS_SERVICES: &[(&str, f64, OsLabel)] = &[
    ("_apple-mobdev2._tcp", 0.90, OsLabel::Ios),
    ("_airplay._tcp", 0.85, OsLabel::MacOs),
    ("_companion-link._tcp", 0.85, OsLabel::Ios),
    ("_homekit._tcp", 0.80, OsLabel::MacOs),
    ("_rdlink._tcp", 0.85, OsLabel::MacOs),
    ("_smb._tcp", 0.30, OsLabel::Unknown),
];

/// Accumulates weighted OS signals per MAC during capture.
pub struct FingerprintEngine {
    registry: Arc<DeviceRegistry>,
    signals: RwLock<HashMap<MacAddr, Vec<Signal>>>,
}

impl FingerprintEngine {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            signals: RwLock::new(HashMap::new()),
        }
    }

    /// Stored at most once per (MAC, type, detail).
    fn add_signal(&self, mac: MacAddr, signal: Signal) {
        let mut signals = self.signals.write();
        let list = signals.entry(mac).or_default();
        if list
            .iter()
            .any(|s| s.kind == signal.kind && s.detail == signal.detail)
        {
            return;
        }
        list.push(signal);
    }

    pub fn signals_for(&self, mac: MacAddr) -> Vec<Signal> {
        self.signals.read().get(&mac).cloned().unwrap_or_default()
    }

    fn check_mdns(&self, packet: &PacketView<'_>) -> Option<Signal> {
        let (_, dst_port, transport) = packet.transport_ports()?;
        if transport != Transport::Udp || dst_port != 5353 {
            return None;
        }
        let dns = packet.dns()?;

        for name in &dns.questions {
            for (service, weight, os) in MDNS_SERVICES {
                if name.contains(service) {
                    return Some(Signal::new(SignalKind::Mdns, *service, *weight, *os));
                }
            }
        }

        for name in &dns.answers {
            if name.contains("_apple") {
                return Some(Signal::new(
                    SignalKind::Mdns,
                    "apple-service",
                    0.70,
                    OsLabel::MacOs,
                ));
            }
        }

        // Any other mDNS chatter leans Apple, weakly.
        Some(Signal::new(SignalKind::Mdns, "generic", 0.50, OsLabel::MacOs))
    }

    fn check_llmnr(&self, packet: &PacketView<'_>) -> Option<Signal> {
        let (_, dst_port, transport) = packet.transport_ports()?;
        if transport != Transport::Udp || dst_port != 5355 {
            return None;
        }
        Some(Signal::new(
            SignalKind::Llmnr,
            "query",
            0.80,
            OsLabel::Windows,
        ))
    }

    fn check_nbns(&self, packet: &PacketView<'_>) -> Option<Signal> {
        let (_, dst_port, transport) = packet.transport_ports()?;
        if transport != Transport::Udp || (dst_port != 137 && dst_port != 138) {
            return None;
        }
        Some(Signal::new(
            SignalKind::Nbns,
            "query",
            0.75,
            OsLabel::Windows,
        ))
    }

    /// Initial-TTL bands: packets a hop or three from their origin still
    /// sit just under the stack's starting value.
    fn check_ttl(&self, packet: &PacketView<'_>) -> Option<Signal> {
        let ttl = packet.ttl()?;
        if (125..=128).contains(&ttl) {
            return Some(Signal::new(SignalKind::Ttl, "128", 0.30, OsLabel::Windows));
        }
        if (61..=64).contains(&ttl) {
            return Some(Signal::new(SignalKind::Ttl, "64", 0.30, OsLabel::Linux));
        }
        None
    }

    /// Resolve accumulated signals into per-device guesses.
    ///
    /// Each signal list is written to its device along with the winning
    /// OS and confidence. Devices without signals are left untouched;
    /// signals for MACs that never became devices are dropped.
    pub fn apply_fingerprints(&self) {
        let signals = self.signals.read();
        for (mac, list) in signals.iter() {
            let (os, confidence) = resolve(list);
            let list = list.clone();
            self.registry.update(*mac, |device| {
                device.os_guess = Some(os.to_string());
                device.confidence = confidence;
                device.signals = list;
            });
        }
    }
}

impl PacketSink for FingerprintEngine {
    fn process(&self, packet: &PacketView<'_>) {
        let Some(src_mac) = packet.src_mac() else {
            return;
        };

        if let Some(signal) = self.check_mdns(packet) {
            self.add_signal(src_mac, signal);
        }
        if let Some(signal) = self.check_llmnr(packet) {
            self.add_signal(src_mac, signal);
        }
        if let Some(signal) = self.check_nbns(packet) {
            self.add_signal(src_mac, signal);
        }
        if let Some(signal) = self.check_ttl(packet) {
            self.add_signal(src_mac, signal);
        }
    }
}

/// Pick the OS with the highest summed weight.
///
/// Confidence is the winner's share of the total known-OS weight; totals
/// under 1.0 are not scaled up, so a single 0.85 signal yields 0.85, not
/// the 0.95 cap.
fn resolve(signals: &[Signal]) -> (OsLabel, f64) {
    let mut scores: HashMap<OsLabel, f64> = HashMap::new();
    for signal in signals {
        if signal.os.is_known() {
            *scores.entry(signal.os).or_default() += signal.weight;
        }
    }
    if scores.is_empty() {
        return (OsLabel::Unknown, 0.0);
    }

    let total: f64 = scores.values().sum();
    let (best_os, best_score) = scores
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((OsLabel::Unknown, 0.0));

    let confidence = (best_score / total.max(1.0)).min(0.95);
    (best_os, confidence)
}
