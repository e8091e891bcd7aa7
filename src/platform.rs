//! Host platform detection and capture prerequisites.
//!
//! Version strings come from the usual per-OS sources; the prerequisite
//! check verifies that live capture can work at all (effective root on
//! unix, a functioning Npcap on Windows).

use crate::error::{Result, SensorError};

#[derive(Debug, Clone)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
    pub arch: String,
}

pub fn hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(target_os = "linux")]
pub fn os_info() -> OsInfo {
    let mut version = std::fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|content| {
            content.lines().find_map(|line| {
                line.strip_prefix("PRETTY_NAME=")
                    .map(|value| value.trim_matches('"').to_string())
            })
        })
        .unwrap_or_default();

    if version.is_empty() {
        version = command_output("uname", &["-r"]).unwrap_or_else(|| "unknown".to_string());
    }

    OsInfo {
        name: "Linux".to_string(),
        version,
        arch: std::env::consts::ARCH.to_string(),
    }
}

#[cfg(target_os = "macos")]
pub fn os_info() -> OsInfo {
    OsInfo {
        name: "macOS".to_string(),
        version: command_output("sw_vers", &["-productVersion"])
            .unwrap_or_else(|| "unknown".to_string()),
        arch: std::env::consts::ARCH.to_string(),
    }
}

#[cfg(target_os = "windows")]
pub fn os_info() -> OsInfo {
    OsInfo {
        name: "Windows".to_string(),
        version: command_output("cmd", &["/c", "ver"]).unwrap_or_else(|| "unknown".to_string()),
        arch: std::env::consts::ARCH.to_string(),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn os_info() -> OsInfo {
    OsInfo {
        name: std::env::consts::OS.to_string(),
        version: "unknown".to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

#[cfg(unix)]
pub fn check_prerequisites() -> Result<()> {
    // CAP_NET_RAW would also do on Linux, but effective root is the
    // common case and the cheap check.
    if unsafe { libc::geteuid() } != 0 {
        return Err(SensorError::Prerequisites(
            "packet capture requires root privileges (run with sudo)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(windows)]
pub fn check_prerequisites() -> Result<()> {
    // If the capture driver is missing, device enumeration fails.
    match pcap::Device::list() {
        Ok(_) => Ok(()),
        Err(e) => Err(SensorError::Prerequisites(format!(
            "Npcap is not available ({}); download from https://npcap.com",
            e
        ))),
    }
}

#[cfg(not(any(unix, windows)))]
pub fn check_prerequisites() -> Result<()> {
    Err(SensorError::Prerequisites(format!(
        "unsupported platform: {}",
        std::env::consts::OS
    )))
}

#[cfg(target_os = "linux")]
pub fn guidance() -> &'static str {
    "Linux Prerequisites:\n\
     \x20 1. Run with sudo: sudo lanwatch\n\
     \x20 2. Or grant capability: sudo setcap cap_net_raw+ep $(command -v lanwatch)\n\
     \n\
     Raw packet capture requires root privileges or the CAP_NET_RAW\n\
     capability on the binary."
}

#[cfg(target_os = "macos")]
pub fn guidance() -> &'static str {
    "macOS Prerequisites:\n\
     \x20 1. Run with sudo: sudo lanwatch\n\
     \n\
     On macOS, opening an interface in promiscuous mode requires\n\
     elevated privileges."
}

#[cfg(target_os = "windows")]
pub fn guidance() -> &'static str {
    "Windows Prerequisites:\n\
     \x20 1. Install Npcap from https://npcap.com\n\
     \x20 2. Run from an Administrator prompt."
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn guidance() -> &'static str {
    "This platform is not fully supported; packet capture may not work."
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
