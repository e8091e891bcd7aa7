//! Orchestration of a full capture run.
//!
//! Wires the OUI lookup, registry, analyzer, and fingerprint engine onto
//! one capture engine, optionally runs the ARP sweep first, and blocks
//! for the configured duration. SIGINT/SIGTERM cancel the shared token;
//! a cancelled run still produces a (partial) summary.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use ipnetwork::Ipv4Network;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::Engine;
use crate::config::SensorConfig;
use crate::discovery::{ActiveDiscovery, DeviceRegistry, PassiveDiscovery};
use crate::error::SensorError;
use crate::fingerprint::FingerprintEngine;
use crate::iface::{InterfaceInfo, Selector};
use crate::oui::OuiDb;
use crate::output::{SensorInfo, Summary};
use crate::platform;
use crate::traffic::TrafficAnalyzer;

/// Deadline for the optional ARP sweep.
const ACTIVE_SWEEP_TIMEOUT: Duration = Duration::from_secs(10);
/// Assumed prefix length when deriving the sweep subnet from the local
/// address. Interrogating the OS for the real mask would be better.
const ASSUMED_PREFIX: u8 = 24;

pub struct Sensor {
    config: SensorConfig,
    iface: InterfaceInfo,
}

impl Sensor {
    /// Validate the configuration and resolve the capture interface.
    pub fn new(config: SensorConfig) -> std::result::Result<Self, SensorError> {
        config.validate()?;

        let selector = Selector::new();
        let iface = match &config.interface {
            Some(name) => selector.by_name(name)?,
            None if config.auto_select => selector.auto_select()?,
            None => return Err(SensorError::NoInterfaceSelected),
        };

        Ok(Self { config, iface })
    }

    pub fn interface(&self) -> &InterfaceInfo {
        &self.iface
    }

    /// Preferred local address: RFC1918 IPv4 first, then any IPv4.
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        let v4s: Vec<Ipv4Addr> = self
            .iface
            .ips
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(*v4),
                IpAddr::V6(_) => None,
            })
            .collect();
        v4s.iter().copied().find(Ipv4Addr::is_private).or_else(|| v4s.first().copied())
    }

    /// Run the capture pipeline to completion and build the summary.
    pub async fn run(&self) -> Result<Summary> {
        let local_ip = self.local_ip();

        let oui = Arc::new(OuiDb::new());
        let registry = Arc::new(DeviceRegistry::new());
        let analyzer = Arc::new(TrafficAnalyzer::new(local_ip.map(IpAddr::V4)));
        let fingerprints = Arc::new(FingerprintEngine::new(registry.clone()));
        let passive = Arc::new(PassiveDiscovery::new(registry.clone(), oui.clone()));

        let engine = Arc::new(Engine::new(
            self.iface.name.clone(),
            self.config.capture.clone(),
        ));
        engine.add_handler(passive);
        engine.add_handler(analyzer.clone());
        engine.add_handler(fingerprints.clone());

        let cancel = CancellationToken::new();
        let signal_task = tokio::spawn(watch_signals(cancel.clone()));

        if self.config.active_discovery {
            self.run_active_sweep(&registry, &oui, &cancel).await;
            info!(devices = registry.count(), "active discovery finished");
        }

        let start_time = Local::now();
        info!(
            iface = %self.iface.name,
            duration_secs = self.config.duration_secs,
            "starting capture"
        );

        let capture_engine = engine.clone();
        let capture_cancel = cancel.clone();
        let duration = Duration::from_secs(self.config.duration_secs);
        tokio::task::spawn_blocking(move || capture_engine.start(&capture_cancel, duration))
            .await
            .context("capture task failed")??;

        signal_task.abort();

        fingerprints.apply_fingerprints();

        let os_info = platform::os_info();
        let mut summary = Summary::new(SensorInfo {
            os: os_info.name,
            hostname: platform::hostname(),
            interface: self.iface.name.clone(),
            local_ip: local_ip.map(|ip| ip.to_string()).unwrap_or_default(),
        });
        summary.set_capture_info(
            start_time,
            self.config.duration_secs,
            engine.packet_count(),
        );
        summary.set_devices(registry.to_info_list());
        summary.set_traffic(analyzer.get_results());

        info!(
            packets = summary.capture.packet_count,
            devices = summary.devices.len(),
            "capture complete"
        );
        Ok(summary)
    }

    /// ARP-sweep the assumed local /24. Failures here degrade the run,
    /// they never abort it.
    async fn run_active_sweep(
        &self,
        registry: &Arc<DeviceRegistry>,
        oui: &Arc<OuiDb>,
        cancel: &CancellationToken,
    ) {
        let (Some(local_ip), Some(local_mac)) = (self.local_ip(), self.iface.mac) else {
            warn!("active discovery needs a local IPv4 address and MAC; skipping sweep");
            return;
        };

        let network = Ipv4Addr::from(u32::from(local_ip) & 0xffff_ff00);
        let subnet = match Ipv4Network::new(network, ASSUMED_PREFIX) {
            Ok(subnet) => subnet,
            Err(e) => {
                warn!(error = %e, "could not derive sweep subnet; skipping sweep");
                return;
            }
        };

        info!(%subnet, "running active discovery");
        let sweep = ActiveDiscovery::new(
            registry.clone(),
            oui.clone(),
            self.iface.name.clone(),
            local_mac,
            local_ip,
            subnet,
        );
        let sweep_cancel = cancel.clone();
        let result =
            tokio::task::spawn_blocking(move || sweep.run(&sweep_cancel, ACTIVE_SWEEP_TIMEOUT))
                .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "active discovery warning"),
            Err(e) => warn!(error = %e, "active discovery task failed"),
        }
    }
}

/// Cancel the shared token on SIGINT or SIGTERM.
async fn watch_signals(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "could not install SIGTERM handler");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, stopping capture");
                    cancel.cancel();
                }
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("interrupt received, stopping capture");
        cancel.cancel();
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping capture");
            cancel.cancel();
        }
    }
}
