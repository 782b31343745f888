//! # Record-Signing Pipeline
//!
//! Entry point: load configuration, start the pipeline, serve the control
//! plane and stop cleanly on Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use signing_runtime::http::serve;
use signing_runtime::{PipelineContainer, RuntimeConfig, SigningRuntime};
use signing_telemetry::init_telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to read configuration")?;
    let _telemetry =
        init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.telemetry.service_name,
        "Record-signing pipeline starting"
    );

    let listen = config.registry.listen;
    let container =
        Arc::new(PipelineContainer::new(config).context("Failed to build pipeline")?);
    container
        .seed_keys()
        .await
        .context("Failed to seed signing keys")?;

    let mut runtime = SigningRuntime::new(container);
    runtime.start().context("Failed to start consumers")?;

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind control plane on {listen}"))?;
    let mut server = tokio::spawn(serve(
        listener,
        runtime.control_plane(),
        runtime.cancel_token(),
    ));

    let server_result = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            None
        }
        result = &mut server => Some(result),
    };

    for (stage, stats) in runtime.shutdown().await {
        info!(
            stage,
            handled = stats.handled(),
            dead_lettered = stats.dead_lettered,
            "Stage stopped"
        );
    }

    let result = match server_result {
        Some(result) => result,
        None => server.await,
    };
    result
        .context("Control plane task panicked")?
        .context("Control plane failed")?;

    info!("Record-signing pipeline stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
