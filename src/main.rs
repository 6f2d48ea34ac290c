use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use sshwatch::{config, Monitor, MonitorConfig, NotifyOutcome};

#[derive(Debug, Parser)]
#[command(name = "sshwatch", version, about = "Report SSH reachability changes to chat")]
struct Cli {
    /// JSON config file; optional when the environment provides every setting
    #[arg(long, env = "SSHWATCH_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Env file loaded before reading the environment (defaults to ./.env if present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Keep running, checking every SECS seconds, instead of a single check
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loaded first so RUST_LOG from the env file applies.
    match &cli.env_file {
        Some(path) => config::load_env_file(path, true)?,
        None => config::load_env_file(Path::new(".env"), false)?,
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let config = MonitorConfig::load(&cli.config, |key| std::env::var(key).ok())
        .with_context(|| format!("Invalid configuration (config file {})", cli.config.display()))?;
    let monitor = Monitor::from_config(&config)?;

    let Some(secs) = cli.interval else {
        let report = monitor.run_once().await.context("Check failed")?;
        if let NotifyOutcome::Failed(reason) = &report.notification {
            warn!(%reason, "Finished with an undelivered notification");
        }
        return Ok(());
    };

    monitor.announce_start().await;

    tokio::select! {
        _ = monitor.run(Duration::from_secs(secs)) => {}
        res = signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received. Stopping sshwatch...");
        }
    }

    Ok(())
}
