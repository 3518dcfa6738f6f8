// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use nodelocaldns_webhook::{
    config::{load_injection_spec, Cli},
    constants::TOKIO_WORKER_THREADS,
    discovery::discover_cluster_dns,
    engine::AdmissionEngine,
    server::WebhookServer,
};
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("nodelocaldns-webhook")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Respects RUST_LOG if set, otherwise falls back to --log-level
    // Respects RUST_LOG_FORMAT=json for structured output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting node-local DNS webhook");

    // Only the ring provider is compiled in; an install failure means one is already set
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let cluster_dns_address = match cli.cluster_dns_address.as_deref().map(str::trim) {
        Some(address) if !address.is_empty() => {
            info!(address = %address, "Using configured cluster DNS address");
            address.to_string()
        }
        _ => {
            debug!("Initializing Kubernetes client");
            let client = Client::try_default()
                .await
                .context("failed to create Kubernetes client")?;
            discover_cluster_dns(client).await?
        }
    };

    let dns = load_injection_spec(&cli.injection_settings(), &cluster_dns_address)
        .context("invalid DNS injection configuration")?;

    let engine = AdmissionEngine::new(dns);
    let dns = engine.dns_spec();
    info!(
        nameservers = ?dns.nameservers(),
        cluster_domain = %dns.cluster_domain(),
        options = dns.options().len(),
        "DNS injection configuration loaded"
    );

    let server_config = cli.server_config()?;
    let mut server = WebhookServer::new(server_config, engine);
    server.start().await?;

    shutdown_signal().await?;

    if let Err(e) = server.stop().await {
        error!(error = %e, "Webhook server did not shut down cleanly");
        return Err(e.into());
    }

    info!("Node-local DNS webhook exited");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, starting graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, starting graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, starting graceful shutdown");
    }

    Ok(())
}
