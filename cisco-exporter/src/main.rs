//! Prometheus exporter for Cisco devices.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use cisco_exporter::{ExporterConfig, HttpServer};
use cisco_exporter_collector::Orchestrator;

/// Prometheus exporter for Cisco IOS, IOS-XE and NX-OS devices.
#[derive(Parser, Debug)]
#[command(name = "cisco-exporter")]
#[command(about = "Export Cisco device metrics collected over SSH")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Comma separated targets (overrides config).
    #[arg(long, value_delimiter = ',')]
    targets: Option<Vec<String>>,

    /// Offer CBC ciphers to older devices.
    #[arg(long)]
    legacy_ciphers: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExporterConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config '{}'", path))?,
        None => ExporterConfig::default(),
    };

    if let Some(listen) = args.listen {
        config.http.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(targets) = args.targets {
        config.collector.targets = targets;
    }
    if args.legacy_ciphers {
        config.collector.ssh.legacy_ciphers = true;
    }

    cisco_exporter_common::init_tracing(&config.logging)?;
    config.validate().context("Invalid configuration")?;

    info!("Starting Cisco Exporter");

    let targets = config.collector.parsed_targets()?;
    if targets.is_empty() {
        tracing::warn!("No targets configured; only an empty scrape will be served");
    }

    let orchestrator =
        Orchestrator::from_config(&config.collector).context("Failed to set up SSH client")?;

    let listen_addr: SocketAddr = config
        .http
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    info!(
        targets = targets.len(),
        max_concurrency = config.collector.max_concurrency,
        request_timeout_secs = config.collector.request_timeout_secs,
        "Collector ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        orchestrator,
        targets,
        listen_addr,
        config.http.path.clone(),
    );
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
