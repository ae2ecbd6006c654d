//! Core data models for the carbon aware scaler

use crate::error::PolicyError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// One carbon intensity forecast point, valid for `[timestamp, timestamp + duration)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    #[serde(rename = "value")]
    pub intensity: f64,
}

impl ForecastSample {
    pub fn new(timestamp: DateTime<Utc>, duration_minutes: u32, intensity: f64) -> Self {
        Self {
            location: None,
            timestamp,
            duration_minutes,
            intensity,
        }
    }

    /// End of the validity window (exclusive)
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp + ChronoDuration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether `at` falls inside the half-open validity window
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.timestamp && at < self.end()
    }
}

/// Forecast samples as delivered by the forecast source
pub type ForecastSeries = Vec<ForecastSample>;

/// Find the first sample whose window contains `at`.
///
/// Linear scan in iteration order: forecast windows are not guaranteed to be
/// disjoint, so when several samples overlap the earliest one in the series
/// wins.
pub fn find_sample(series: &[ForecastSample], at: DateTime<Utc>) -> Option<&ForecastSample> {
    series.iter().find(|sample| sample.covers(at))
}

/// Maps intensities up to `upper_threshold` (inclusive) to a replica cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityBand {
    #[serde(alias = "carbonIntensityThreshold")]
    pub upper_threshold: f64,
    pub max_replicas: u32,
}

impl IntensityBand {
    pub fn new(upper_threshold: f64, max_replicas: u32) -> Self {
        Self {
            upper_threshold,
            max_replicas,
        }
    }
}

/// Absolute period, in RFC 3339, during which eco mode is off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowRule {
    #[serde(alias = "startTime")]
    pub start: String,
    #[serde(alias = "endTime")]
    pub end: String,
}

impl TimeWindowRule {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start.to_rfc3339(), end.to_rfc3339())
    }
}

/// Turns eco mode off when every minute of the trailing window meets the threshold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityDurationRule {
    #[serde(alias = "carbonIntensityThreshold")]
    pub threshold: f64,
    #[serde(alias = "overrideEcoAfterDurationInMins")]
    pub duration_minutes: u32,
}

/// Declarative eco mode override policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoPolicy {
    #[serde(default)]
    pub custom_schedule: Vec<TimeWindowRule>,
    /// Five-field cron expressions, evaluated in UTC
    #[serde(default)]
    pub recurring_schedule: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_intensity_duration: Option<IntensityDurationRule>,
    #[serde(alias = "maxReplicas")]
    pub default_max_replicas: u32,
    #[serde(alias = "maxReplicasByCarbonIntensity")]
    pub intensity_bands: Vec<IntensityBand>,
}

impl EcoPolicy {
    /// Policy with only intensity bands and a default cap
    pub fn with_bands(default_max_replicas: u32, intensity_bands: Vec<IntensityBand>) -> Self {
        Self {
            default_max_replicas,
            intensity_bands,
            ..Self::default()
        }
    }

    /// Read a policy from a JSON document
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PolicyError::Parse {
            path: display,
            source,
        })
    }
}

/// Rule family that switched eco mode off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideTrigger {
    CustomSchedule,
    RecurringSchedule,
    IntensityDuration,
    Demand,
    /// The decision could not be evaluated and the default cap was used
    FailOpen,
}

impl OverrideTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideTrigger::CustomSchedule => "custom_schedule",
            OverrideTrigger::RecurringSchedule => "recurring_schedule",
            OverrideTrigger::IntensityDuration => "intensity_duration",
            OverrideTrigger::Demand => "demand",
            OverrideTrigger::FailOpen => "fail_open",
        }
    }
}

impl fmt::Display for OverrideTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial result of a single override rule
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideResult {
    pub trigger: OverrideTrigger,
    pub reason: String,
    /// Explicit re-evaluation delay bound to the active override, if any
    pub wake_delay: Option<Duration>,
}

impl OverrideResult {
    pub fn new(trigger: OverrideTrigger, reason: impl Into<String>) -> Self {
        Self {
            trigger,
            reason: reason.into(),
            wake_delay: None,
        }
    }

    pub fn with_wake_delay(mut self, delay: Duration) -> Self {
        self.wake_delay = Some(delay);
        self
    }
}

/// Outcome of one evaluation. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub overridden: bool,
    pub reason: String,
    pub max_replicas: u32,
    pub next_evaluation_delay: Duration,
    pub trigger: Option<OverrideTrigger>,
}

impl Decision {
    pub fn eco(max_replicas: u32, reason: impl Into<String>, next_evaluation_delay: Duration) -> Self {
        Self {
            overridden: false,
            reason: reason.into(),
            max_replicas,
            next_evaluation_delay,
            trigger: None,
        }
    }

    pub fn overridden(
        result: OverrideResult,
        default_max_replicas: u32,
        next_evaluation_delay: Duration,
    ) -> Self {
        Self {
            overridden: true,
            reason: result.reason,
            max_replicas: default_max_replicas,
            next_evaluation_delay,
            trigger: Some(result.trigger),
        }
    }

    /// Default cap used when the decision itself could not be computed
    pub fn fail_open(
        default_max_replicas: u32,
        reason: impl Into<String>,
        retry_after: Duration,
    ) -> Self {
        Self::overridden(
            OverrideResult::new(OverrideTrigger::FailOpen, reason),
            default_max_replicas,
            retry_after,
        )
    }
}
