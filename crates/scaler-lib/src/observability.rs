//! Observability infrastructure for the carbon aware scaler
//!
//! Provides:
//! - Prometheus metrics (reconciles, resolved caps, carbon intensity, eco mode state)
//! - Structured JSON logging with tracing
//!
//! Metrics live in a registry owned by [`ScalerMetrics`] and are handed to the
//! reconciler explicitly, so tests and multiple scalers never collide on a
//! process-wide registry.

use crate::models::Decision;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

const SCALER_LABEL: &str = "scaler";

/// Inner metrics structure that holds the actual Prometheus metrics
struct ScalerMetricsInner {
    registry: Registry,
    reconciles_total: IntCounterVec,
    reconcile_errors_total: IntCounterVec,
    carbon_intensity: GaugeVec,
    default_max_replicas: IntGaugeVec,
    max_replicas: IntGaugeVec,
    eco_mode_off_total: IntCounterVec,
    target_current_replicas: IntGaugeVec,
    target_desired_replicas: IntGaugeVec,
    decision_latency_seconds: HistogramVec,
}

impl ScalerMetricsInner {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let reconciles_total = IntCounterVec::new(
            Opts::new("carbon_scaler_reconciles_total", "Total number of reconciles"),
            &[SCALER_LABEL],
        )?;
        let reconcile_errors_total = IntCounterVec::new(
            Opts::new(
                "carbon_scaler_reconcile_errors_total",
                "Total number of reconcile errors",
            ),
            &[SCALER_LABEL],
        )?;
        let carbon_intensity = GaugeVec::new(
            Opts::new(
                "carbon_scaler_carbon_intensity",
                "Forecast carbon intensity covering the last evaluation",
            ),
            &[SCALER_LABEL],
        )?;
        let default_max_replicas = IntGaugeVec::new(
            Opts::new(
                "carbon_scaler_default_max_replicas",
                "Max replicas used while eco mode is off",
            ),
            &[SCALER_LABEL],
        )?;
        let max_replicas = IntGaugeVec::new(
            Opts::new("carbon_scaler_max_replicas", "Max replicas last decided"),
            &[SCALER_LABEL],
        )?;
        let eco_mode_off_total = IntCounterVec::new(
            Opts::new(
                "carbon_scaler_eco_mode_off_total",
                "Evaluations by eco mode state (code=1 when off)",
            ),
            &[SCALER_LABEL, "code"],
        )?;
        let target_current_replicas = IntGaugeVec::new(
            Opts::new(
                "carbon_scaler_target_current_replicas",
                "Current replicas reported by the scaled target",
            ),
            &[SCALER_LABEL],
        )?;
        let target_desired_replicas = IntGaugeVec::new(
            Opts::new(
                "carbon_scaler_target_desired_replicas",
                "Desired replicas reported by the target's autoscaler",
            ),
            &[SCALER_LABEL],
        )?;
        let decision_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "carbon_scaler_decision_latency_seconds",
                "Time spent evaluating a scaling decision",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &[SCALER_LABEL],
        )?;

        registry.register(Box::new(reconciles_total.clone()))?;
        registry.register(Box::new(reconcile_errors_total.clone()))?;
        registry.register(Box::new(carbon_intensity.clone()))?;
        registry.register(Box::new(default_max_replicas.clone()))?;
        registry.register(Box::new(max_replicas.clone()))?;
        registry.register(Box::new(eco_mode_off_total.clone()))?;
        registry.register(Box::new(target_current_replicas.clone()))?;
        registry.register(Box::new(target_desired_replicas.clone()))?;
        registry.register(Box::new(decision_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            reconciles_total,
            reconcile_errors_total,
            carbon_intensity,
            default_max_replicas,
            max_replicas,
            eco_mode_off_total,
            target_current_replicas,
            target_desired_replicas,
            decision_latency_seconds,
        })
    }
}

/// Scaler metrics for Prometheus exposition
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct ScalerMetrics {
    inner: Arc<ScalerMetricsInner>,
}

impl ScalerMetrics {
    /// Create a metrics handle with a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            inner: Arc::new(ScalerMetricsInner::new()?),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub fn inc_reconciles(&self, scaler: &str) {
        self.inner.reconciles_total.with_label_values(&[scaler]).inc();
    }

    pub fn inc_reconcile_errors(&self, scaler: &str) {
        self.inner
            .reconcile_errors_total
            .with_label_values(&[scaler])
            .inc();
    }

    pub fn set_carbon_intensity(&self, scaler: &str, intensity: f64) {
        self.inner
            .carbon_intensity
            .with_label_values(&[scaler])
            .set(intensity);
    }

    pub fn set_default_max_replicas(&self, scaler: &str, replicas: u32) {
        self.inner
            .default_max_replicas
            .with_label_values(&[scaler])
            .set(i64::from(replicas));
    }

    /// Record the outcome of a decision
    pub fn record_decision(&self, scaler: &str, decision: &Decision) {
        self.inner
            .max_replicas
            .with_label_values(&[scaler])
            .set(i64::from(decision.max_replicas));
        let code = if decision.overridden { "1" } else { "0" };
        self.inner
            .eco_mode_off_total
            .with_label_values(&[scaler, code])
            .inc();
    }

    pub fn set_target_replicas(&self, scaler: &str, current: Option<u32>, desired: Option<u32>) {
        if let Some(current) = current {
            self.inner
                .target_current_replicas
                .with_label_values(&[scaler])
                .set(i64::from(current));
        }
        if let Some(desired) = desired {
            self.inner
                .target_desired_replicas
                .with_label_values(&[scaler])
                .set(i64::from(desired));
        }
    }

    pub fn observe_decision_latency(&self, scaler: &str, duration_secs: f64) {
        self.inner
            .decision_latency_seconds
            .with_label_values(&[scaler])
            .observe(duration_secs);
    }
}

/// Structured logger for scaler events
///
/// Provides consistent JSON-formatted logging for decisions, overrides
/// and failures around the decision engine.
#[derive(Clone)]
pub struct StructuredLogger {
    scaler: String,
}

impl StructuredLogger {
    pub fn new(scaler: impl Into<String>) -> Self {
        Self {
            scaler: scaler.into(),
        }
    }

    /// Log scaler startup
    pub fn log_startup(&self, version: &str, forecast_source: &str, target: &str) {
        info!(
            event = "scaler_started",
            scaler = %self.scaler,
            version = %version,
            forecast_source = %forecast_source,
            target_name = %target,
            "Carbon aware scaler started"
        );
    }

    /// Log scaler shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "scaler_shutdown",
            scaler = %self.scaler,
            reason = %reason,
            "Carbon aware scaler shutting down"
        );
    }

    /// Log an evaluated decision
    pub fn log_decision(&self, decision: &Decision, intensity: Option<f64>) {
        info!(
            event = "decision_evaluated",
            scaler = %self.scaler,
            max_replicas = decision.max_replicas,
            overridden = decision.overridden,
            reason = %decision.reason,
            intensity = ?intensity,
            next_evaluation_secs = decision.next_evaluation_delay.as_secs_f64(),
            "Evaluated scaling decision"
        );
    }

    /// Log eco mode being switched off
    pub fn log_eco_mode_disabled(&self, decision: &Decision) {
        warn!(
            event = "eco_mode_disabled",
            scaler = %self.scaler,
            trigger = ?decision.trigger,
            reason = %decision.reason,
            max_replicas = decision.max_replicas,
            "Eco mode disabled"
        );
    }

    pub fn log_forecast_failure(&self, source: &str, error: &str) {
        warn!(
            event = "forecast_fetch_failed",
            scaler = %self.scaler,
            forecast_source = %source,
            error = %error,
            "Failed to fetch carbon forecast"
        );
    }

    pub fn log_evaluation_failure(&self, error: &str) {
        warn!(
            event = "evaluation_failed",
            scaler = %self.scaler,
            error = %error,
            "Unable to evaluate carbon policy, using default max replicas"
        );
    }

    pub fn log_target_failure(&self, target: &str, operation: &str, error: &str) {
        warn!(
            event = "target_update_failed",
            scaler = %self.scaler,
            target_name = %target,
            operation = %operation,
            error = %error,
            "Scale target operation failed"
        );
    }

    pub fn log_max_replicas_applied(&self, target: &str, max_replicas: u32) {
        info!(
            event = "max_replicas_applied",
            scaler = %self.scaler,
            target_name = %target,
            max_replicas = max_replicas,
            "Successfully set max replicas"
        );
    }
}
