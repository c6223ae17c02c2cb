//! wallboxctl - UDP control client for KeContact wallboxes
//!
//! Queries status reports and sets the charging current limit over the
//! device's plain-text UDP command/response protocol.

mod config;
mod network;
mod protocol;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use network::{resolve_host, WallboxClient};

/// wallboxctl - query and control a KeContact wallbox over UDP
#[derive(Parser)]
#[command(name = "wallboxctl")]
#[command(author = "wallboxctl Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Query and control a KeContact wallbox over UDP", long_about = None)]
struct Cli {
    /// Wallbox host name or IP address (overrides the config file)
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Wallbox UDP port (overrides the config file)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the device identity text
    Info,

    /// Fetch a report and print it as JSON
    Report {
        /// Report number: 1 (device), 2 (state), 3 (metering), 100+ (sessions)
        n: u32,
    },

    /// Shortcut for report 2, the charging state report
    Status,

    /// Set the charging current limit
    SetCurrent {
        /// Limit in milliamps: 6000-63000, or 0 to disable the current timer
        #[arg(value_parser = parse_milliamps)]
        current: u32,

        /// Apply the limit after this many seconds (up to 860400)
        #[arg(short, long, default_value_t = 0)]
        delay: u32,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// The device takes whole milliamps; accept "6300", "6300.0" and friends
fn parse_milliamps(arg: &str) -> Result<u32, String> {
    let value: f64 = arg
        .parse()
        .map_err(|_| format!("not a number: {arg}"))?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(format!("milliamp value out of range: {arg}"));
    }
    Ok(value as u32)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    if let Commands::Config { generate, output } = &cli.command {
        if *generate {
            let sample = config::generate_sample_config();
            if let Some(path) = output {
                std::fs::write(path, &sample)?;
                println!("Configuration written to: {}", path.display());
            } else {
                println!("{}", sample);
            }
        } else {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        return Ok(());
    }

    let host = cli
        .host
        .clone()
        .or_else(|| config.device.host.clone())
        .context("no wallbox host given; use --host or set [device] host in the config file")?;
    let port = cli.port.unwrap_or(config.device.port);
    let addr = resolve_host(&host, port).await?;

    let mut client = WallboxClient::with_retries(addr, config.client.retries);
    client
        .connect()
        .await
        .with_context(|| format!("connecting to wallbox at {addr}"))?;

    match cli.command {
        Commands::Info => {
            let info = client.device_info().await?;
            println!("{}", info);
        }
        Commands::Report { n } => {
            print_report(&mut client, n).await?;
        }
        Commands::Status => {
            print_report(&mut client, 2).await?;
        }
        Commands::SetCurrent { current, delay } => {
            client.set_charging_current(current, Some(delay)).await?;
            println!("Current limit set to {} mA (delay {} s)", current, delay);
        }
        Commands::Config { .. } => unreachable!("handled before connecting"),
    }

    client.close();
    Ok(())
}

/// Fetch one report and print its fields as pretty JSON
async fn print_report(client: &mut WallboxClient, n: u32) -> anyhow::Result<()> {
    let report = client.get_report(n).await?;
    println!("{}", serde_json::to_string_pretty(report.fields())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["wallboxctl", "--host", "192.168.178.55", "status"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["wallboxctl", "report", "2"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_set_current_parsing() {
        let cli =
            Cli::try_parse_from(["wallboxctl", "set-current", "6300", "--delay", "10"]).unwrap();
        match cli.command {
            Commands::SetCurrent { current, delay } => {
                assert_eq!(current, 6300);
                assert_eq!(delay, 10);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_milliamps_tolerate_float_input() {
        assert_eq!(parse_milliamps("6300").unwrap(), 6300);
        assert_eq!(parse_milliamps("6300.0").unwrap(), 6300);
        assert_eq!(parse_milliamps("6300.7").unwrap(), 6300);
        assert_eq!(parse_milliamps("0").unwrap(), 0);
        assert!(parse_milliamps("six thousand").is_err());
        assert!(parse_milliamps("-1").is_err());
        assert!(parse_milliamps("inf").is_err());
    }
}
