//! Linkpool - Pre-established Tunnel Connection Pool
//!
//! This is the main entry point for the Linkpool daemon. It keeps one or
//! both pool roles alive from a TOML configuration and reports their state.

use anyhow::{Context, Result};
use clap::Parser;
use linkpool::cert::SelfSignedCert;
use linkpool::config::{load_config, ServerPoolConfig};
use linkpool::Pool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

/// Linkpool - keeps idle tunnel connections ready on both ends
#[derive(Parser, Debug)]
#[command(name = "linkpool")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (none, debug, info, event, warn, error, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,

    /// Write the generated server certificate (PEM) to this path
    #[arg(long)]
    export_cert: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = load_config(&args.config)?;

    info!("Linkpool v{}", linkpool::VERSION);
    info!("Configuration loaded from: {:?}", args.config);

    let mut pools: Vec<(&str, Arc<Pool>)> = Vec::new();

    if let Some(server) = config.server.clone() {
        let pool = start_server(server, args.export_cert.as_deref()).await?;
        pool.start();
        pools.push(("server", pool));
    }

    if let Some(client) = config.client.clone() {
        info!(
            "Maintaining connections to: {} (tls: {})",
            client.remote_addr,
            client.tls.is_tls()
        );
        let pool = Pool::client(client).context("Failed to create client pool")?;
        pool.start();
        pools.push(("client", pool));
    }

    let mut report = tokio::time::interval(config.report_interval());
    report.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = report.tick() => {
                for (role, pool) in &pools {
                    report_stats(role, pool);
                }
            }
        }
    }

    for (role, pool) in &pools {
        pool.close().await;
        info!("Closed {} pool", role);
    }

    Ok(())
}

async fn start_server(config: ServerPoolConfig, export_cert: Option<&Path>) -> Result<Arc<Pool>> {
    let tls = match &config.tls_name {
        Some(name) => {
            let cert = SelfSignedCert::generate(name)
                .with_context(|| format!("Failed to generate certificate for {}", name))?;
            info!("Generated self-signed certificate for {}", name);

            if let Some(path) = export_cert {
                std::fs::write(path, cert.cert_pem())
                    .with_context(|| format!("Failed to write certificate: {:?}", path))?;
                info!("Certificate written to: {:?}", path);
            }
            Some(cert.server_config()?)
        }
        None => {
            if export_cert.is_some() {
                warn!("No tls_name configured, nothing to export");
            }
            None
        }
    };

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Accepting pool connections on: {}", config.bind_addr);

    Ok(Pool::server(config, listener, tls))
}

fn report_stats(role: &str, pool: &Pool) {
    let stats = pool.stats();
    info!(
        "{} pool: idle={}, capacity={}, interval={:?}, registered={}, rejected={}, acquired={}, flushed={}",
        role,
        pool.active(),
        pool.capacity(),
        pool.interval(),
        stats.total_registered,
        stats.total_rejected,
        stats.total_acquired,
        stats.total_flushed
    );
}

/// Wait for Ctrl+C or a termination signal (cross-platform)
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
                return;
            }
            Err(e) => warn!("Failed to setup SIGTERM handler: {}", e),
        }
    }

    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C, shutting down...");
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "none" | "off" => LevelFilter::OFF,
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" | "event" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
