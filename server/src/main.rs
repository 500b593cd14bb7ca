//! eventgate HTTP server.
//!
//! Moderated event registration with capacity-limited admission.

use anyhow::Context;
use eventgate_runtime::metrics::MetricsServer;
use eventgate_server::Config;
use eventgate_server::bootstrap::{build_desk, connect_storage, metrics_router, shutdown_signal};
use eventgate_web::{AppState, router};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting eventgate");

    let config = Config::from_env();
    info!(
        addr = %config.server.addr(),
        backend = if config.postgres.is_some() { "postgres" } else { "memory" },
        max_retries = config.admission.max_retries,
        "Configuration loaded"
    );

    // Metrics
    let mut metrics = MetricsServer::new(
        config
            .server
            .metrics_addr()
            .context("invalid METRICS_HOST")?,
    );
    metrics.start()?;
    let metrics = Arc::new(metrics);
    let metrics_listener = tokio::net::TcpListener::bind(metrics.addr()).await?;
    info!(addr = %metrics.addr(), "Metrics endpoint listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_router(metrics)).await {
            warn!(error = %e, "Metrics endpoint stopped");
        }
    });

    // Storage and desk
    let storage = connect_storage(&config).await?;
    let desk = build_desk(&config, storage);
    let app = router(AppState::new(desk));

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    });
    let mut server = tokio::spawn(async move { serve.await });

    tokio::select! {
        result = &mut server => result??,
        _ = signalled_rx => {
            let grace = config.server.shutdown_grace();
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result??,
                Err(_) => warn!(
                    timeout_secs = grace.as_secs(),
                    "Shutdown timeout elapsed, abandoning in-flight requests"
                ),
            }
        }
    }

    info!("Server stopped");
    Ok(())
}
