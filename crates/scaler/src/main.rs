//! Carbon aware scaler - caps a workload's replicas by grid carbon intensity
//!
//! Runs the reconcile loop against the configured forecast source and a
//! dry-run scale target, and serves probes, metrics and the latest decision.

use anyhow::{Context, Result};
use carbon_scaler::{api, config::ScalerConfig};
use scaler_lib::{
    forecast::create_source,
    health::{components, HealthRegistry},
    observability::{ScalerMetrics, StructuredLogger},
    reconciler::ReconcilerBuilder,
    target::InMemoryTarget,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SCALER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting carbon-scaler");

    let config = ScalerConfig::load()?;
    let policy = config.load_policy()?;
    info!(
        scaler = %config.scaler_name,
        policy_path = %config.policy_path.display(),
        default_max_replicas = policy.default_max_replicas,
        bands = policy.intensity_bands.len(),
        "Scaler configured"
    );

    let source = create_source(config.mock_forecast, config.forecast_path.as_deref())
        .context("no forecast source configured, set SCALER_MOCK_FORECAST or SCALER_FORECAST_PATH")?;

    let target = Arc::new(InMemoryTarget::new(&config.target_name, config.target_kind));
    target
        .set_observed(config.target_current_replicas, config.target_desired_replicas)
        .await;

    let health_registry = HealthRegistry::new();
    health_registry.register(components::FORECAST_SOURCE).await;
    health_registry.register(components::DECISION_ENGINE).await;
    health_registry.register(components::SCALE_TARGET).await;

    let metrics = ScalerMetrics::new()?;

    let logger = StructuredLogger::new(&config.scaler_name);
    logger.log_startup(SCALER_VERSION, &source.describe(), &config.target_name);

    let reconciler = Arc::new(
        ReconcilerBuilder::new(&config.scaler_name)
            .policy(policy)
            .source(source)
            .target(target)
            .fallback_granularity(config.fallback_granularity_minutes)
            .metrics(metrics)
            .health(health_registry)
            .build()?,
    );

    let app_state = Arc::new(api::AppState::new(reconciler.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(reconciler.clone().run(shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    // The loop may already be gone if the receiver was dropped
    let _ = shutdown_tx.send(());
    loop_handle.await?;
    info!("Shutting down");

    Ok(())
}
