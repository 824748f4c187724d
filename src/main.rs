//! Registry gateway
//!
//! Serves the gateway in front of the bundled in-memory backend.

use registry_gateway::{build_router, GatewayConfig, HttpMetrics, MemoryRegistry};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registry_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()
        .map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })?
        .with_health_info("version", env!("CARGO_PKG_VERSION"))
        .with_health_info("backend", "memory");

    info!(
        listen = %config.listen,
        auth_enabled = !config.auth_token.is_empty(),
        return_error_details = config.return_error_details,
        "Configuration loaded"
    );

    let metrics = HttpMetrics::new()?;
    let backend = Arc::new(MemoryRegistry::from_config(&config));
    let app = build_router(backend, &config, &metrics);

    let listener = TcpListener::bind(config.listen).await.map_err(|e| {
        error!("Failed to bind {}: {}", config.listen, e);
        e
    })?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, shutting down"),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
