//! Backend entry point for the MR-ROBOT site.
//!
//! Startup order:
//!
//! 1. Structured logging (`RUST_LOG`, default `info`)
//! 2. Store configuration from the environment
//! 3. [`DualStore::initialize`]: pools for both stores, one probe each
//! 4. HTTP server until Ctrl-C or `SIGTERM`
//! 5. Graceful drain of both store pools
//!
//! The process refuses to start when neither store is configured or
//! neither store answers its startup probe.

use std::sync::Arc;

use mrrobot_server::{serve, AppState, ServerConfig};
use mrrobot_store::{DualStore, MediatorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, store initialization, or the server
/// fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("mrrobot-server starting");

    let store_config = MediatorConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    info!(
        store_a = store_config.store_a.is_some(),
        store_b = store_config.store_b.is_some(),
        probe_timeout_ms = store_config.probe_timeout.as_millis(),
        reprobe_interval_ms = store_config.reprobe_interval.as_millis(),
        host = server_config.host,
        port = server_config.port,
        "Configuration loaded"
    );

    let store = DualStore::initialize(&store_config).await?;
    store.ensure_available().await?;

    let state = Arc::new(AppState::new(store));
    let result = serve(&server_config, Arc::clone(&state), shutdown_signal()).await;

    state.store.shutdown().await;
    info!("mrrobot-server shutdown complete");

    result?;
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
