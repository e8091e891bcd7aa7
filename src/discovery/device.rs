//! Discovered-device model and the MAC-keyed registry.
//!
//! The registry exclusively owns every `Device`; readers get clones and
//! writers go through closures executed under the write lock, so no
//! references ever escape the guard. Safe against concurrent handler
//! invocations from the capture thread and the active-sweep listener.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Local};
use parking_lot::RwLock;

use crate::capture::packet::{is_unusable_ip, MacAddr};
use crate::fingerprint::Signal;
use crate::output::DeviceInfo;

/// How a device first entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverySource {
    Passive,
    ActiveArp,
    ActiveMdns,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscoverySource::Passive => "passive",
            DiscoverySource::ActiveArp => "active-arp",
            DiscoverySource::ActiveMdns => "active-mdns",
        };
        write!(f, "{}", s)
    }
}

/// A device observed on the broadcast domain, keyed by MAC.
#[derive(Debug, Clone)]
pub struct Device {
    /// Canonical lowercase colon-separated MAC; immutable after creation.
    pub mac: String,
    pub ips: BTreeSet<IpAddr>,
    /// Write-once: first resolved vendor wins.
    pub vendor: Option<String>,
    /// Write-once: first non-empty hostname wins.
    pub hostname: Option<String>,
    pub os_guess: Option<String>,
    pub confidence: f64,
    pub signals: Vec<Signal>,
    pub source: DiscoverySource,
    pub first_seen: DateTime<Local>,
    pub last_seen: DateTime<Local>,
}

impl Device {
    fn new(mac: MacAddr) -> Self {
        let now = Local::now();
        Self {
            mac: mac.to_string(),
            ips: BTreeSet::new(),
            vendor: None,
            hostname: None,
            os_guess: None,
            confidence: 0.0,
            signals: Vec::new(),
            source: DiscoverySource::Passive,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Add an address to the IP set; unusable addresses are rejected.
    pub fn add_ip(&mut self, ip: IpAddr) {
        if is_unusable_ip(&ip) {
            return;
        }
        self.ips.insert(ip);
    }

    pub fn set_vendor_if_empty(&mut self, vendor: &str) {
        if self.vendor.is_none() && !vendor.is_empty() {
            self.vendor = Some(vendor.to_string());
        }
    }

    pub fn set_hostname_if_empty(&mut self, hostname: &str) {
        if self.hostname.is_none() && !hostname.is_empty() {
            self.hostname = Some(hostname.to_string());
        }
    }

    /// Convert to the summary output shape.
    pub fn to_info(&self) -> DeviceInfo {
        DeviceInfo {
            mac: self.mac.clone(),
            ips: self.ips.iter().map(|ip| ip.to_string()).collect(),
            vendor: self.vendor.clone(),
            hostname: self.hostname.clone(),
            os_guess: self.os_guess.clone(),
            confidence: (self.confidence > 0.0).then_some(self.confidence),
            signals_used: self.signals.iter().map(Signal::tag).collect(),
            discovery_source: self.source.to_string(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        }
    }
}

/// Concurrent MAC to device map with process-lifetime retention.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<MacAddr, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create followed by an in-place mutation.
    ///
    /// Creates the device (stamping first/last seen) when absent, applies
    /// `mutate` under the write lock, and advances last-seen.
    pub fn upsert(&self, mac: MacAddr, mutate: impl FnOnce(&mut Device)) {
        let mut devices = self.devices.write();
        let device = devices.entry(mac).or_insert_with(|| Device::new(mac));
        mutate(device);
        device.last_seen = Local::now();
    }

    /// Mutate an existing device; a miss is a no-op. Returns whether the
    /// device existed.
    pub fn update(&self, mac: MacAddr, mutate: impl FnOnce(&mut Device)) -> bool {
        let mut devices = self.devices.write();
        match devices.get_mut(&mac) {
            Some(device) => {
                mutate(device);
                device.last_seen = Local::now();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, mac: MacAddr) -> Option<Device> {
        self.devices.read().get(&mac).cloned()
    }

    /// Snapshot of all devices, ordered by MAC for stable output.
    pub fn all(&self) -> Vec<Device> {
        let devices = self.devices.read();
        let mut all: Vec<Device> = devices.values().cloned().collect();
        all.sort_by(|a, b| a.mac.cmp(&b.mac));
        all
    }

    pub fn count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn to_info_list(&self) -> Vec<DeviceInfo> {
        self.all().iter().map(Device::to_info).collect()
    }
}
