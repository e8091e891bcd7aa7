//! lanwatch: a local-network visibility sensor.
//!
//! The pipeline is a single-producer fan-out: one capture thread reads
//! frames from the selected interface and dispatches each to the passive
//! discovery, traffic analysis, and OS fingerprinting handlers. An
//! optional ARP sweep seeds the device registry before capture starts.

pub mod capture;
pub mod config;
pub mod consent;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod iface;
pub mod oui;
pub mod output;
pub mod platform;
pub mod sensor;
pub mod traffic;

pub use capture::{Engine, MacAddr, PacketSink, PacketView};
pub use error::{Result, SensorError};
pub use sensor::Sensor;
