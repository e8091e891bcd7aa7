//! Sensor configuration.
//!
//! Built from CLI flags; there is no config file. `CaptureSettings`
//! carries the pcap handle parameters with defaults suitable for
//! header-level LAN capture.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};

/// Capture durations the CLI accepts, in seconds.
pub const ALLOWED_DURATIONS: &[u64] = &[30, 60];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Explicit interface name; overrides auto-selection.
    pub interface: Option<String>,

    /// Pick the best-scoring interface when none is named.
    #[serde(default = "default_true")]
    pub auto_select: bool,

    /// Capture duration in seconds (30 or 60).
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Run the ARP sweep before passive capture.
    #[serde(default)]
    pub active_discovery: bool,

    /// Directory the summary file is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Skip the platform prerequisite check.
    #[serde(default)]
    pub skip_prereq_check: bool,

    #[serde(default)]
    pub capture: CaptureSettings,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            interface: None,
            auto_select: true,
            duration_secs: default_duration(),
            active_discovery: false,
            output_dir: default_output_dir(),
            skip_prereq_check: false,
            capture: CaptureSettings::default(),
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_DURATIONS.contains(&self.duration_secs) {
            return Err(SensorError::InvalidDuration(self.duration_secs));
        }
        Ok(())
    }
}

/// Parameters for the live pcap handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Snapshot length in bytes; 1600 covers headers on ethernet MTUs.
    pub snap_len: i32,
    pub promiscuous: bool,
    /// Read timeout; bounds how long cancellation can go unnoticed.
    pub read_timeout_ms: i32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            snap_len: 1600,
            promiscuous: true,
            read_timeout_ms: 100,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_duration() -> u64 {
    30
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
