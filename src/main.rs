//! Prediction Gateway - Main Entry Point
//!
//! Loads every artifact once, then serves the prediction endpoints until
//! interrupted.

use anyhow::{Context, Result};
use prediction_gateway::{
    api::{self, AppState},
    config::{AppConfig, LoggingConfig},
    metrics::{GatewayMetrics, MetricsReporter},
    pipeline::PredictionService,
    registry::ArtifactRegistry,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Prediction Gateway");

    // Blocking startup phase: nothing is served until every entry was tried
    let registry = Arc::new(ArtifactRegistry::load(&config.artifacts));
    info!(
        "Artifact registry ready: {}/{} available",
        registry.available_count(),
        registry.len()
    );

    // Initialize metrics
    let metrics = Arc::new(GatewayMetrics::new());

    let service = Arc::new(PredictionService::new(
        registry,
        &config.pipelines,
        metrics.clone(),
    ));
    for endpoint in service.endpoint_status() {
        if endpoint.available {
            info!(domain = %endpoint.domain, "Endpoint ready");
        } else {
            warn!(
                domain = %endpoint.domain,
                missing = ?endpoint.missing,
                "Endpoint disabled until its artifacts are restored"
            );
        }
    }

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(service, &config.pipelines.dataset);
    let app = api::router(state, config.server.permissive_cors);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Print final summary
    info!("Gateway shutting down...");
    metrics.print_summary();

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("prediction_gateway={},tower_http=info", logging.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.is_json() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
