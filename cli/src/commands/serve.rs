// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Broker HTTP server
//!
//! Loads configuration once, wires the helm-backed engine into the service
//! broker and serves the OSB API until Ctrl+C or SIGTERM. TLS is served via
//! rustls when both certificate and key files are configured.

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use helm_broker_core::application::broker::ServiceBroker;
use helm_broker_core::domain::config::Config;
use helm_broker_core::infrastructure::helm::HelmClient;
use helm_broker_core::presentation::api::app;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub async fn execute(config_path: Option<PathBuf>, listen_address: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    info!(
        services = config.broker.catalog.services.len(),
        namespace = %config.helm.default_namespace,
        prefix = %config.helm.release_name_prefix,
        "Configuration loaded"
    );

    let addr: SocketAddr = listen_address
        .parse()
        .with_context(|| format!("Invalid listen address {:?}", listen_address))?;

    let engine = Arc::new(HelmClient::with_process_executor(config.helm.clone()));
    let broker_config = Arc::new(config.broker);
    let broker = Arc::new(ServiceBroker::new(broker_config.clone(), engine));
    let router = app(broker);

    if broker_config.tls_enabled() {
        let rustls_config =
            RustlsConfig::from_pem_file(&broker_config.tls_cert_file, &broker_config.tls_key_file)
                .await
                .context("TLS configuration error")?;

        info!(address = %addr, cert = %broker_config.tls_cert_file, "Broker listening (TLS enabled)");

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(router.into_make_service())
            .await
            .context("HTTP server failed")?;
    } else {
        warn!("TLS is disabled; broker credentials travel in clear text");

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        info!(address = %addr, "Broker listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;
    }

    info!("Broker shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
