//! Sensor error taxonomy.
//!
//! Per-packet decode failures never surface here; they are `Option`-shaped
//! and skipped at the call site. This enum covers the fatal and
//! operation-level failures the orchestrator maps to exit codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("interface {0:?} not found")]
    UnknownInterface(String),

    #[error("no suitable network interface found")]
    NoSuitableInterface,

    #[error("no interface specified (use --iface or --auto-iface)")]
    NoInterfaceSelected,

    #[error("invalid capture duration {0}s (expected 30 or 60)")]
    InvalidDuration(u64),

    #[error("failed to enumerate interfaces: {0}")]
    InterfaceEnumeration(#[source] pcap::Error),

    #[error("prerequisites not met: {0}")]
    Prerequisites(String),

    #[error("failed to open interface {iface}: {source}")]
    CaptureOpen {
        iface: String,
        #[source]
        source: pcap::Error,
    },

    #[error("failed to write summary: {0}")]
    OutputWrite(String),

    #[error("user declined authorization")]
    ConsentDeclined,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SensorError>;
