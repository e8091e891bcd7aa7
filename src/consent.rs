//! Operator consent gate.
//!
//! Capture must not start until the operator has acknowledged what the
//! tool does. Acknowledgement is remembered in a marker file in the home
//! directory; failing to write the marker is only a warning.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::Local;
use tracing::warn;

use crate::error::{Result, SensorError};

const CONSENT_BANNER: &str = r#"
================================================================================
                    LOCAL NETWORK VISIBILITY SENSOR
================================================================================

This tool captures network traffic on your local network to discover
devices and analyze traffic patterns.

WHAT THIS TOOL DOES:
  - Captures packets on your selected network interface
  - Identifies devices by MAC address and IP
  - Determines device vendors (via OUI lookup) and operating systems
  - Analyzes traffic protocols, ports, and DNS queries
  - Generates summary reports (no payload storage by default)

REQUIREMENTS:
  - Administrator/root privileges are required for packet capture
  - On Windows: Npcap must be installed (https://npcap.com)
  - On macOS/Linux: Run with sudo

PRIVACY & LEGAL NOTICE:
  - Only use this tool on networks you own or have explicit authorization
    to monitor. Unauthorized network monitoring may violate laws.
  - By default, this tool only collects metadata (no packet payloads).
  - OS detection uses best-effort heuristics with confidence scores.

================================================================================
"#;

const MARKER_FILENAME: &str = ".network-sensor-consent";

/// Check for prior consent and prompt for it when absent.
///
/// Returns `ConsentDeclined` when the operator does not answer yes.
pub fn check_and_prompt() -> Result<()> {
    let marker = marker_path();
    if marker.exists() {
        return Ok(());
    }

    print!("{}", CONSENT_BANNER);
    print!("Do you acknowledge and wish to continue? [y/N]: ");
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().lock().read_line(&mut response)?;
    let response = response.trim().to_lowercase();
    if response != "y" && response != "yes" {
        return Err(SensorError::ConsentDeclined);
    }

    if let Err(e) = save_marker(&marker) {
        warn!(path = %marker.display(), error = %e, "could not save consent marker");
    }
    Ok(())
}

/// Remove the consent marker, forcing a re-prompt on the next run.
pub fn reset() -> Result<()> {
    match std::fs::remove_file(marker_path()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn marker_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(MARKER_FILENAME)
}

fn save_marker(path: &PathBuf) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("Consented at: {}\n", Local::now().to_rfc3339()))
}
