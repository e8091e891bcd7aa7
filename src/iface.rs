//! Network interface enumeration, scoring, and auto-selection.
//!
//! Capture-capable devices come from pcap; MAC addresses and up/loopback
//! flags are merged in from the OS interface table. Scoring prefers up,
//! physical-looking interfaces holding RFC1918 addresses. Ties keep
//! enumeration order.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::IpAddr;

use regex::RegexSet;

use crate::capture::packet::MacAddr;
use crate::error::{Result, SensorError};

/// Name patterns that mark an interface as virtual.
const VIRTUAL_PATTERNS: &[&str] = &[
    r"^lo\d*$",
    r"^docker\d*$",
    r"^veth.*",
    r"^br-.*",
    r"^virbr\d*$",
    r"^vmnet\d*$",
    r"^vboxnet\d*$",
    r"^utun\d*$",
    r"^awdl\d*$",
    r"^llw\d*$",
    r"^bridge\d*$",
    r"^Loopback.*",
    r"^isatap.*",
    r"^Teredo.*",
    r".*Hyper-V.*",
    r".*Virtual.*Adapter",
];

#[cfg(target_os = "macos")]
const PHYSICAL_PATTERNS: &[&str] = &[r"^en\d+$"];
#[cfg(target_os = "linux")]
const PHYSICAL_PATTERNS: &[&str] = &[r"^eth\d+$", r"^wlan\d+$", r"^enp\d+s\d+.*", r"^wlp\d+s\d+.*"];
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const PHYSICAL_PATTERNS: &[&str] = &[];

#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub description: String,
    pub mac: Option<MacAddr>,
    pub ips: Vec<IpAddr>,
    pub is_up: bool,
    pub is_loopback: bool,
    pub is_virtual: bool,
    /// Selection score; zero means unusable.
    pub score: i32,
}

pub struct Selector {
    virtual_names: RegexSet,
    physical_names: RegexSet,
}

impl Selector {
    pub fn new() -> Self {
        Self {
            virtual_names: RegexSet::new(VIRTUAL_PATTERNS).expect("virtual name patterns compile"),
            physical_names: RegexSet::new(PHYSICAL_PATTERNS)
                .expect("physical name patterns compile"),
        }
    }

    /// All capture-capable interfaces, best score first.
    pub fn list(&self) -> Result<Vec<InterfaceInfo>> {
        let devices = pcap::Device::list().map_err(SensorError::InterfaceEnumeration)?;

        // OS interface table for MACs and link flags.
        let system: HashMap<String, pnet::datalink::NetworkInterface> =
            pnet::datalink::interfaces()
                .into_iter()
                .map(|iface| (iface.name.clone(), iface))
                .collect();

        let mut result = Vec::with_capacity(devices.len());
        for device in devices {
            let mut info = InterfaceInfo {
                name: device.name.clone(),
                description: device.desc.clone().unwrap_or_default(),
                mac: None,
                ips: device.addresses.iter().map(|a| a.addr).collect(),
                is_up: false,
                is_loopback: false,
                is_virtual: false,
                score: 0,
            };

            if let Some(sys) = system.get(&device.name) {
                info.mac = sys.mac.map(|mac| MacAddr(mac.octets()));
                info.is_up = sys.is_up();
                info.is_loopback = sys.is_loopback();
            } else {
                // Not in the OS table; fall back to what pcap showed us.
                info.is_up = !device.addresses.is_empty();
                info.is_loopback = is_loopback_name(&device.name);
            }

            info.is_virtual = self.virtual_names.is_match(&info.name);
            info.score = self.score(&info);
            result.push(info);
        }

        // Stable sort keeps enumeration order on ties.
        result.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(result)
    }

    /// Highest-scoring usable interface.
    pub fn auto_select(&self) -> Result<InterfaceInfo> {
        self.list()?
            .into_iter()
            .find(|iface| iface.score > 0)
            .ok_or(SensorError::NoSuitableInterface)
    }

    pub fn by_name(&self, name: &str) -> Result<InterfaceInfo> {
        self.list()?
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| SensorError::UnknownInterface(name.to_string()))
    }

    fn score(&self, info: &InterfaceInfo) -> i32 {
        if info.is_loopback || info.is_virtual || !info.is_up {
            return 0;
        }

        let mut score = 0;
        for ip in &info.ips {
            if let IpAddr::V4(v4) = ip {
                if v4.is_private() {
                    score += 100;
                } else {
                    score += 20;
                }
            }
        }

        if self.is_physical_name(&info.name) {
            score += 50;
        }
        if !info.description.is_empty() {
            score += 5;
        }
        score
    }

    fn is_physical_name(&self, name: &str) -> bool {
        if cfg!(target_os = "windows") {
            let lower = name.to_lowercase();
            return lower.contains("ethernet") || lower.contains("wi-fi");
        }
        self.physical_names.is_match(name)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_loopback_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "lo" || lower == "lo0" || lower.contains("loopback")
}

/// Numbered interface listing for `--list-ifaces`.
pub fn format_interface_list(ifaces: &[InterfaceInfo]) -> String {
    let mut out = String::from("Available Network Interfaces:\n");
    out.push_str(&"-".repeat(70));
    out.push('\n');

    for (i, iface) in ifaces.iter().enumerate() {
        let status = if iface.is_up { "UP" } else { "DOWN" };
        let mut flags = String::new();
        if iface.is_loopback {
            flags.push_str(" [loopback]");
        }
        if iface.is_virtual {
            flags.push_str(" [virtual]");
        }

        let _ = writeln!(out, "{:2}. {} ({}){}", i + 1, iface.name, status, flags);
        if !iface.description.is_empty() {
            let _ = writeln!(out, "    Description: {}", iface.description);
        }
        if let Some(mac) = iface.mac {
            let _ = writeln!(out, "    MAC: {}", mac);
        }
        if !iface.ips.is_empty() {
            let ips: Vec<String> = iface.ips.iter().map(|ip| ip.to_string()).collect();
            let _ = writeln!(out, "    IPs: {}", ips.join(", "));
        }
        out.push('\n');
    }

    out
}
