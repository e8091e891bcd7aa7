//! Command-line surface and run sequence.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use colored::Colorize;

use lanwatch::config::{SensorConfig, ALLOWED_DURATIONS};
use lanwatch::iface::{format_interface_list, Selector};
use lanwatch::output::{render_console, Generator};
use lanwatch::{consent, platform, Sensor};

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(version, about = "Local network visibility sensor")]
#[command(long_about = "A network visibility tool for authorized operators to discover\n\
    devices on the local network and analyze traffic patterns.\n\n\
    Traffic is captured passively (and optionally actively) to build an\n\
    inventory of devices and their behaviors.")]
pub struct Cli {
    /// List available network interfaces and exit
    #[arg(long)]
    pub list_ifaces: bool,

    /// Network interface to capture on
    #[arg(long, value_name = "NAME")]
    pub iface: Option<String>,

    /// Automatically select the best interface
    #[arg(long, action = ArgAction::Set, default_value_t = true, value_name = "BOOL")]
    pub auto_iface: bool,

    /// Capture duration in seconds (30 or 60)
    #[arg(long, default_value_t = 30, value_parser = parse_duration, value_name = "SECONDS")]
    pub duration: u64,

    /// Enable active discovery (ARP sweep)
    #[arg(long)]
    pub active: bool,

    /// Output directory for summary files
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub output: PathBuf,

    /// Skip prerequisite checks
    #[arg(long)]
    pub skip_prereq: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

fn parse_duration(value: &str) -> Result<u64, String> {
    let secs: u64 = value
        .parse()
        .map_err(|_| format!("{} is not a number of seconds", value))?;
    if !ALLOWED_DURATIONS.contains(&secs) {
        return Err(format!("duration must be 30 or 60, got {}", secs));
    }
    Ok(secs)
}

pub async fn run_command(cli: Cli) -> Result<()> {
    let selector = Selector::new();

    if cli.list_ifaces {
        let ifaces = selector.list()?;
        print!("{}", format_interface_list(&ifaces));
        return Ok(());
    }

    consent::check_and_prompt()?;

    let os_info = platform::os_info();
    println!("\n{}", "Local Network Visibility Sensor".cyan());
    println!("OS: {} {} ({})", os_info.name, os_info.version, os_info.arch);

    if !cli.skip_prereq {
        if let Err(e) = platform::check_prerequisites() {
            eprintln!("{}", format!("\nPrerequisites not met: {}", e).red());
            println!("\n{}", "Guidance:".yellow());
            println!("{}", platform::guidance());
            return Err(e.into());
        }
        println!("{}", "Prerequisites satisfied.".green());
    }

    let config = SensorConfig {
        interface: cli.iface,
        auto_select: cli.auto_iface,
        duration_secs: cli.duration,
        active_discovery: cli.active,
        output_dir: cli.output,
        skip_prereq_check: cli.skip_prereq,
        ..Default::default()
    };

    let sensor = Sensor::new(config.clone())?;
    let iface = sensor.interface();
    println!("Interface: {}", iface.name.green());
    if let Some(local_ip) = sensor.local_ip() {
        println!("Local IP: {}", local_ip);
    }
    println!("Duration: {} seconds", config.duration_secs);
    println!("Active discovery: {}", config.active_discovery);
    println!("Output: {}", config.output_dir.display());
    println!();
    println!(
        "{}",
        format!(
            "Capturing for {} seconds... (Ctrl+C to stop early)",
            config.duration_secs
        )
        .yellow()
    );

    let summary = sensor.run().await?;

    println!("{}", render_console(&summary));

    let generator = Generator::new(&config.output_dir);
    let path = generator.generate(&summary)?;
    println!(
        "{}",
        format!("\nSummary written to: {}", path.display()).green()
    );

    Ok(())
}
