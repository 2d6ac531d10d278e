//! Notice Sentinel CLI
//!
//! Command-line interface for the announcement feed watcher.

use std::path::PathBuf;

use clap::Parser;
use notice_sentinel::{load_config, Config, NoticeSentinelBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "notice-sentinel")]
#[command(about = "Announcement feed watcher with one-shot email alerts")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start monitoring right away, alerting this address (overrides config file)
    #[arg(short, long)]
    recipient: Option<String>,

    /// Seconds between feed checks (overrides config file)
    #[arg(long)]
    check_interval: Option<u64>,

    /// Control API port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, recipient={:?}, check_interval={:?}, dashboard_port={:?}, log_level={:?}",
        args.config,
        args.recipient,
        args.check_interval,
        args.dashboard_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    if let Some(recipient) = args.recipient {
        config.recipient = Some(recipient);
    }
    if let Some(check_interval) = args.check_interval {
        config.feed.check_interval_seconds = check_interval;
    }
    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting notice sentinel for {}", config.feed.url);
    tracing::debug!(
        "Check interval: {}s, baseline: {}, selection: {:?}, marker policy: {:?}",
        config.feed.check_interval_seconds,
        config.feed.baseline_identifier,
        config.feed.latest_selection,
        config.feed.marker_policy
    );

    NoticeSentinelBuilder::new(config)
        .build()
        .await?
        .start()
        .await?;

    Ok(())
}
