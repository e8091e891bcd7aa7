//! Summary file generation and console rendering.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SensorError};
use crate::output::Summary;

/// Writes summary JSON files into an output directory.
pub struct Generator {
    output_dir: PathBuf,
}

impl Generator {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Write the summary as pretty JSON; the filename carries the local
    /// capture start time (`summary_YYYYMMDD_HHMMSS.json`).
    pub fn generate(&self, summary: &Summary) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| SensorError::OutputWrite(format!("create output directory: {}", e)))?;

        let filename = format!(
            "summary_{}.json",
            summary.capture.start_time.format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);

        let data = serde_json::to_string_pretty(summary)
            .map_err(|e| SensorError::OutputWrite(format!("marshal summary: {}", e)))?;
        fs::write(&path, data)
            .map_err(|e| SensorError::OutputWrite(format!("write {}: {}", path.display(), e)))?;

        Ok(path)
    }
}

/// Human-readable capture summary for the console.
pub fn render_console(summary: &Summary) -> String {
    let mut out = format!(
        "\nCapture Summary\n\
         ===============\n\
         Sensor:     {} ({})\n\
         Interface:  {} ({})\n\
         Duration:   {} seconds\n\
         Packets:    {}\n\
         Devices:    {} discovered\n\
         \nTop Protocols:\n",
        summary.sensor.hostname,
        summary.sensor.os,
        summary.sensor.interface,
        summary.sensor.local_ip,
        summary.capture.duration,
        summary.capture.packet_count,
        summary.devices.len(),
    );

    for (proto, count) in &summary.traffic.protocol_counts {
        out.push_str(&format!("  {}: {}\n", proto, count));
    }

    if !summary.traffic.top_ports.is_empty() {
        out.push_str("\nTop Ports:\n");
        for port in summary.traffic.top_ports.iter().take(5) {
            out.push_str(&format!(
                "  {}/{}: {}\n",
                port.protocol, port.port, port.count
            ));
        }
    }

    if !summary.devices.is_empty() {
        out.push_str("\nDiscovered Devices:\n");
        let limit = 10;
        for device in summary.devices.iter().take(limit) {
            let os_info = match (&device.os_guess, device.confidence) {
                (Some(guess), Some(confidence)) => {
                    format!("{} ({:.0}%)", guess, confidence * 100.0)
                }
                (Some(guess), None) => guess.clone(),
                _ => "Unknown".to_string(),
            };
            let ips = match device.ips.split_first() {
                Some((first, [])) => first.clone(),
                Some((first, rest)) => format!("{} (+{} more)", first, rest.len()),
                None => String::new(),
            };
            out.push_str(&format!(
                "  {} | {} | {} | {}\n",
                device.mac,
                ips,
                device.vendor.as_deref().unwrap_or(""),
                os_info
            ));
        }
        if summary.devices.len() > limit {
            out.push_str(&format!(
                "  ... and {} more devices\n",
                summary.devices.len() - limit
            ));
        }
    }

    out
}
