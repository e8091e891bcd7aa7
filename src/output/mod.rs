//! Summary output types.
//!
//! These structs define the JSON contract of the summary file. Key names
//! are fixed; optional fields are omitted entirely when absent, never
//! emitted as null.

pub mod summary;

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub use summary::{render_console, Generator};

/// Top-level summary record; immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub sensor: SensorInfo,
    pub capture: CaptureInfo,
    pub devices: Vec<DeviceInfo>,
    pub traffic: TrafficInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorInfo {
    pub os: String,
    pub hostname: String,
    pub interface: String,
    #[serde(rename = "localIP")]
    pub local_ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureInfo {
    pub start_time: DateTime<Local>,
    /// Capture duration in seconds.
    pub duration: u64,
    pub packet_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub mac: String,
    pub ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_guess: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Signals formatted as `type:detail`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals_used: Vec<String>,
    pub discovery_source: String,
    pub first_seen: DateTime<Local>,
    pub last_seen: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfo {
    pub protocol_counts: BTreeMap<String, u64>,
    pub top_ports: Vec<PortCount>,
    pub top_talkers: Vec<TalkerInfo>,
    pub dns_domains: Vec<DnsDomainInfo>,
    pub destinations: Vec<DestinationInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortCount {
    pub port: u16,
    pub protocol: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkerInfo {
    pub ip: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsDomainInfo {
    pub domain: String,
    #[serde(rename = "queryCount")]
    pub query_count: u64,
    #[serde(rename = "queryingIPs", default, skip_serializing_if = "Vec::is_empty")]
    pub querying_ips: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInfo {
    pub address: String,
    pub connection_count: u64,
    pub bytes_total: u64,
}

impl Summary {
    pub fn new(sensor: SensorInfo) -> Self {
        Self {
            sensor,
            capture: CaptureInfo {
                start_time: Local::now(),
                duration: 0,
                packet_count: 0,
            },
            devices: Vec::new(),
            traffic: TrafficInfo::empty(),
        }
    }

    pub fn set_capture_info(
        &mut self,
        start_time: DateTime<Local>,
        duration: u64,
        packet_count: u64,
    ) {
        self.capture = CaptureInfo {
            start_time,
            duration,
            packet_count,
        };
    }

    pub fn set_devices(&mut self, devices: Vec<DeviceInfo>) {
        self.devices = devices;
    }

    pub fn set_traffic(&mut self, traffic: TrafficInfo) {
        self.traffic = traffic;
    }
}

impl TrafficInfo {
    pub fn empty() -> Self {
        Self {
            protocol_counts: BTreeMap::new(),
            top_ports: Vec::new(),
            top_talkers: Vec::new(),
            dns_domains: Vec::new(),
            destinations: Vec::new(),
        }
    }
}
