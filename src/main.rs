//! CLI entry point for the incident reconciliation engine.
//!
//! Exposes the read API (`incidents`, `station-outages`) and the operator
//! refresh trigger (`refresh-all`) over the configured systems.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use transit_incidents::config::Settings;

#[derive(Parser)]
#[command(name = "transit_incidents")]
#[command(about = "Multi-source transit incident reconciliation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current incident document for one system
    Incidents {
        /// System id (e.g. "wmata")
        system: String,
    },
    /// Print current outages at one station
    StationOutages {
        /// System id (e.g. "wmata")
        system: String,
        /// Canonical station id (e.g. "a01")
        station: String,
    },
    /// Force-refresh every configured system, bypassing the cache
    RefreshAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_incidents.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_incidents.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let aggregator = Settings::from_env().build_aggregator();

    match cli.command {
        Commands::Incidents { system } => {
            match aggregator.get_incidents(&system).await {
                Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                None => {
                    warn!(system, "No incident data available");
                    println!("null");
                }
            }
        }
        Commands::StationOutages { system, station } => {
            let outages = aggregator.get_station_outages(&system, &station).await;
            println!("{}", serde_json::to_string_pretty(&outages)?);
        }
        Commands::RefreshAll => {
            let report = aggregator.refresh_all().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.succeeded.is_empty() && !report.failed.is_empty() {
                anyhow::bail!("every system failed to refresh");
            }
            info!(all_succeeded = report.all_succeeded, "Refresh finished");
        }
    }

    Ok(())
}
