//! Reconcile loop
//!
//! Each tick fetches the forecast, reads the target, evaluates the policy and
//! writes the resulting cap back to the target. Every failure along the way
//! fails open to the policy's default cap, so the loop never stops on bad
//! input.

use crate::decision::{DecisionOrchestrator, OrchestratorConfig};
use crate::error::{DecisionError, TargetError};
use crate::forecast::ForecastSource;
use crate::health::{components, HealthRegistry};
use crate::models::{find_sample, Decision, EcoPolicy, OverrideTrigger};
use crate::observability::{ScalerMetrics, StructuredLogger};
use crate::target::{ScaleTarget, TargetSnapshot};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// Condition recorded on the scaler after each reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    Succeeded,
    EcoModeDisabled,
    CarbonDataFetchError,
    TargetFetchError,
    TargetNotFound,
    MaxReplicasCountError,
    EcoModeDisabledError,
    TargetUpdateFailed,
}

impl ConditionReason {
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            ConditionReason::Succeeded | ConditionReason::EcoModeDisabled
        )
    }

    fn for_target_error(error: &TargetError) -> Self {
        match error {
            TargetError::NotFound(_) => ConditionReason::TargetNotFound,
            _ => ConditionReason::TargetFetchError,
        }
    }

    fn for_decision_error(error: &DecisionError) -> Self {
        match error {
            DecisionError::ScheduleParse { .. } => ConditionReason::EcoModeDisabledError,
            DecisionError::NoForecast | DecisionError::InvalidPolicy(_) => {
                ConditionReason::MaxReplicasCountError
            }
        }
    }
}

impl fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of one reconcile, as served by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub scaler: String,
    pub evaluated_at: DateTime<Utc>,
    pub max_replicas: u32,
    pub overridden: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<OverrideTrigger>,
    pub next_evaluation_secs: f64,
    pub condition: ConditionReason,
    /// Whether the cap was written to the target
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

impl ReconcileReport {
    pub fn next_evaluation_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.next_evaluation_secs).unwrap_or_default()
    }
}

/// Drives the decision engine against a forecast source and a scale target
pub struct Reconciler {
    name: String,
    policy: Arc<EcoPolicy>,
    source: Arc<dyn ForecastSource>,
    target: Arc<dyn ScaleTarget>,
    orchestrator: DecisionOrchestrator,
    metrics: ScalerMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
    last_report: RwLock<Option<ReconcileReport>>,
}

impl Reconciler {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &EcoPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &ScalerMetrics {
        &self.metrics
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Report of the most recent reconcile
    pub async fn last_report(&self) -> Option<ReconcileReport> {
        self.last_report.read().await.clone()
    }

    /// Run a single reconcile evaluated at `now`
    pub async fn reconcile_once(&self, now: DateTime<Utc>) -> ReconcileReport {
        let default_max = self.policy.default_max_replicas;
        let retry = self.orchestrator.retry_delay(now);

        self.metrics.inc_reconciles(&self.name);
        self.metrics.set_default_max_replicas(&self.name, default_max);

        let fetched = self.source.fetch().await;
        self.health
            .record(components::FORECAST_SOURCE, &fetched)
            .await;
        let series = fetched.map_err(|e| {
            let message = e.to_string();
            self.logger
                .log_forecast_failure(&self.source.describe(), &message);
            message
        });

        let read = self.target.snapshot().await;
        self.health.record(components::SCALE_TARGET, &read).await;
        let snapshot = match read {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let message = e.to_string();
                self.metrics.inc_reconcile_errors(&self.name);
                self.logger
                    .log_target_failure(self.target.name(), "snapshot", &message);
                let condition = ConditionReason::for_target_error(&e);
                let decision = Decision::fail_open(default_max, message, retry);
                return self.store(now, decision, condition, false, None).await;
            }
        };
        self.record_snapshot(&snapshot);

        let intensity = series
            .as_ref()
            .ok()
            .and_then(|series| find_sample(series, now))
            .map(|sample| sample.intensity);

        let started = Instant::now();
        let (decision, mut condition) = match &series {
            Ok(series) => {
                let desired = snapshot
                    .desired_replicas
                    .filter(|_| self.target.kind().has_demand_signal());
                let evaluated = self.orchestrator.evaluate(now, &self.policy, series, desired);
                self.health
                    .record(components::DECISION_ENGINE, &evaluated)
                    .await;
                match evaluated {
                    Ok(decision) => {
                        let condition = if decision.overridden {
                            ConditionReason::EcoModeDisabled
                        } else {
                            ConditionReason::Succeeded
                        };
                        (decision, condition)
                    }
                    Err(e) => {
                        self.logger.log_evaluation_failure(&e.to_string());
                        (
                            Decision::fail_open(default_max, e.to_string(), retry),
                            ConditionReason::for_decision_error(&e),
                        )
                    }
                }
            }
            Err(message) => (
                Decision::fail_open(default_max, message.clone(), retry),
                ConditionReason::CarbonDataFetchError,
            ),
        };
        self.metrics
            .observe_decision_latency(&self.name, started.elapsed().as_secs_f64());

        let written = self.target.apply_max_replicas(decision.max_replicas).await;
        if written.is_err() {
            self.health.record(components::SCALE_TARGET, &written).await;
        }
        let applied = match written {
            Ok(()) => {
                self.logger
                    .log_max_replicas_applied(self.target.name(), decision.max_replicas);
                true
            }
            Err(e) => {
                let message = e.to_string();
                self.metrics.inc_reconcile_errors(&self.name);
                self.logger
                    .log_target_failure(self.target.name(), "apply_max_replicas", &message);
                condition = ConditionReason::TargetUpdateFailed;
                false
            }
        };

        if let Some(intensity) = intensity {
            self.metrics.set_carbon_intensity(&self.name, intensity);
        }
        self.metrics.record_decision(&self.name, &decision);
        self.logger.log_decision(&decision, intensity);
        if decision.overridden {
            self.logger.log_eco_mode_disabled(&decision);
        }

        self.store(now, decision, condition, applied, intensity).await
    }

    fn record_snapshot(&self, snapshot: &TargetSnapshot) {
        self.metrics.set_target_replicas(
            &self.name,
            snapshot.current_replicas,
            snapshot.desired_replicas,
        );
    }

    async fn store(
        &self,
        now: DateTime<Utc>,
        decision: Decision,
        condition: ConditionReason,
        applied: bool,
        intensity: Option<f64>,
    ) -> ReconcileReport {
        let report = ReconcileReport {
            scaler: self.name.clone(),
            evaluated_at: now,
            max_replicas: decision.max_replicas,
            overridden: decision.overridden,
            reason: decision.reason,
            trigger: decision.trigger,
            next_evaluation_secs: decision.next_evaluation_delay.as_secs_f64(),
            condition,
            applied,
            intensity,
        };
        debug!(
            scaler = %self.name,
            condition = %condition,
            applied,
            "Reconcile complete"
        );
        *self.last_report.write().await = Some(report.clone());
        report
    }

    /// Reconcile until shutdown, sleeping for each decision's delay
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            scaler = %self.name,
            target_name = %self.target.name(),
            "Starting reconcile loop"
        );

        let mut first = true;
        loop {
            let report = self.reconcile_once(Utc::now()).await;
            if first {
                self.health.set_ready(true).await;
                first = false;
            }

            tokio::select! {
                _ = tokio::time::sleep(report.next_evaluation_delay()) => {}
                _ = shutdown.recv() => {
                    self.logger.log_shutdown("shutdown signal received");
                    break;
                }
            }
        }
    }
}

/// Builder for the reconciler
pub struct ReconcilerBuilder {
    name: String,
    policy: Option<Arc<EcoPolicy>>,
    source: Option<Arc<dyn ForecastSource>>,
    target: Option<Arc<dyn ScaleTarget>>,
    orchestrator: OrchestratorConfig,
    metrics: Option<ScalerMetrics>,
    health: Option<HealthRegistry>,
}

impl ReconcilerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: None,
            source: None,
            target: None,
            orchestrator: OrchestratorConfig::default(),
            metrics: None,
            health: None,
        }
    }

    pub fn policy(mut self, policy: impl Into<Arc<EcoPolicy>>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    pub fn source(mut self, source: Arc<dyn ForecastSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn target(mut self, target: Arc<dyn ScaleTarget>) -> Self {
        self.target = Some(target);
        self
    }

    /// Granularity used when no forecast sample covers the evaluation instant
    pub fn fallback_granularity(mut self, minutes: u32) -> Self {
        self.orchestrator.fallback_granularity_minutes = minutes;
        self
    }

    pub fn metrics(mut self, metrics: ScalerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<Reconciler> {
        let policy = self
            .policy
            .ok_or_else(|| anyhow::anyhow!("Policy is required"))?;
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Forecast source is required"))?;
        let target = self
            .target
            .ok_or_else(|| anyhow::anyhow!("Scale target is required"))?;
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => ScalerMetrics::new()?,
        };

        Ok(Reconciler {
            logger: StructuredLogger::new(self.name.clone()),
            name: self.name,
            policy,
            source,
            target,
            orchestrator: DecisionOrchestrator::with_config(self.orchestrator),
            metrics,
            health: self.health.unwrap_or_default(),
            last_report: RwLock::new(None),
        })
    }
}
