//! Single-tick decision composition
//!
//! Runs the eco mode override rules first, falls back to the intensity bands,
//! lets present demand veto a restrictive cap, and finally settles when the
//! next evaluation is due.

use super::{DemandGuard, EcoModeEvaluator, ReplicaBandResolver, WakeScheduler};
use super::wake::DEFAULT_GRANULARITY_MINUTES;
use crate::error::DecisionError;
use crate::models::{find_sample, Decision, EcoPolicy, ForecastSample};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Configuration for the decision orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Granularity used for the next tick when no forecast sample covers now
    pub fallback_granularity_minutes: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fallback_granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
        }
    }
}

/// Composes the decision components into one evaluation
///
/// Holds no state between calls; identical inputs give identical decisions.
#[derive(Debug, Clone, Default)]
pub struct DecisionOrchestrator {
    config: OrchestratorConfig,
}

impl DecisionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    /// Evaluate `policy` at `now`.
    ///
    /// `observed_desired` is the autoscaler's desired replica count for targets
    /// that expose one; the demand check is skipped when it is `None`.
    pub fn evaluate(
        &self,
        now: DateTime<Utc>,
        policy: &EcoPolicy,
        series: &[ForecastSample],
        observed_desired: Option<u32>,
    ) -> Result<Decision, DecisionError> {
        if policy.intensity_bands.is_empty() {
            return Err(DecisionError::InvalidPolicy(
                "at least one intensity band is required".into(),
            ));
        }

        let current = find_sample(series, now);

        if let Some(result) = EcoModeEvaluator::evaluate(now, policy, series)? {
            let delay = result
                .wake_delay
                .unwrap_or_else(|| self.default_delay(now, current));
            return Ok(Decision::overridden(
                result,
                policy.default_max_replicas,
                delay,
            ));
        }

        let computed_max = ReplicaBandResolver::resolve(current, &policy.intensity_bands)?;
        let delay = self.default_delay(now, current);

        if let Some(desired) = observed_desired {
            if let Some(result) = DemandGuard::guard(computed_max, desired) {
                debug!(computed_max, desired, "Demand exceeds carbon cap");
                return Ok(Decision::overridden(
                    result,
                    policy.default_max_replicas,
                    delay,
                ));
            }
        }

        // `resolve` succeeded, so a sample covers now
        let intensity = current.map(|sample| sample.intensity).unwrap_or_default();
        Ok(Decision::eco(
            computed_max,
            format!(
                "carbon intensity {} selects max replicas {}",
                intensity, computed_max
            ),
            delay,
        ))
    }

    /// Tick aligned to the covering sample's granularity
    fn default_delay(&self, now: DateTime<Utc>, current: Option<&ForecastSample>) -> Duration {
        let granularity = current
            .map(|sample| sample.duration_minutes)
            .unwrap_or(self.config.fallback_granularity_minutes);
        WakeScheduler::next_tick(now, granularity)
    }

    /// Delay callers should use before retrying after a failed evaluation
    pub fn retry_delay(&self, now: DateTime<Utc>) -> Duration {
        WakeScheduler::next_tick(now, self.config.fallback_granularity_minutes)
    }
}
