//! Wiring: storage selection, the desk, the metrics endpoint and shutdown.

use crate::config::Config;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use eventgate_core::error::StoreError;
use eventgate_core::store::Storage;
use eventgate_postgres::PostgresStore;
use eventgate_runtime::metrics::MetricsServer;
use eventgate_runtime::retry::{RetryPolicy, retry_with_backoff};
use eventgate_runtime::{DeskConfig, DeskEnvironment, EventDesk};
use eventgate_testing::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Connect to the configured backend.
///
/// With `DATABASE_URL` set, connects to `PostgreSQL` (retrying while the
/// database starts up) and runs migrations. Otherwise uses the in-memory
/// backend, which loses all data on exit.
///
/// # Errors
///
/// Returns the last connection error, or a migration failure.
pub async fn connect_storage(config: &Config) -> Result<Arc<dyn Storage>, StoreError> {
    let Some(postgres) = &config.postgres else {
        warn!("DATABASE_URL not set, using the in-memory backend; data will not survive a restart");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    info!("Connecting to PostgreSQL...");
    let pool = postgres.pool();
    let startup = RetryPolicy::builder()
        .max_retries(10)
        .initial_delay(Duration::from_millis(200))
        .max_delay(Duration::from_secs(5))
        .build();
    let store = retry_with_backoff(startup, || PostgresStore::connect(&postgres.url, &pool)).await?;

    store.migrate().await?;
    info!(
        max_connections = pool.max_connections,
        "PostgreSQL connected and migrated"
    );
    Ok(Arc::new(store))
}

/// Build the desk over `storage` with the configured retry policy.
#[must_use]
pub fn build_desk(config: &Config, storage: Arc<dyn Storage>) -> EventDesk {
    EventDesk::new(
        storage,
        DeskEnvironment::default(),
        DeskConfig {
            retry: config.admission.retry_policy(),
        },
    )
}

/// Router serving `GET /metrics` from the Prometheus recorder.
pub fn metrics_router(metrics: Arc<MetricsServer>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<Arc<MetricsServer>>) -> (StatusCode, String) {
    match metrics.render() {
        Some(body) => (StatusCode::OK, body),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Resolve when the process receives Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn memory_backend_without_database_url() {
        let config = Config::from_lookup(|_| None);

        let storage = connect_storage(&config).await.unwrap();
        assert_eq!(storage.backend(), "memory");

        let desk = build_desk(&config, storage);
        assert_eq!(desk.config().retry.max_retries, 5);
        assert!(desk.health().await.is_healthy());
    }

    #[tokio::test]
    async fn metrics_endpoint_without_recorder() {
        let metrics = Arc::new(MetricsServer::new("127.0.0.1:0".parse().unwrap()));

        let response = metrics_router(metrics)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
