//! Eco mode override evaluation
//!
//! Eco mode (carbon aware capping) is on by default. Three rule families can
//! switch it off, checked in a fixed order where the first match wins:
//! 1. absolute time windows
//! 2. recurring calendar rules
//! 3. sustained carbon intensity over a trailing duration
//!
//! Every rule produces its own immutable partial result; nothing is carried
//! over between families.

use super::recurring::RecurringRule;
use crate::error::DecisionError;
use crate::models::{
    find_sample, EcoPolicy, ForecastSample, IntensityDurationRule, OverrideResult,
    OverrideTrigger,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::debug;

/// Absolute window with parsed bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduledWindow {
    /// Strict interior check; the boundary instants are outside
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start < now && now < self.end
    }
}

/// Policy override rules with every schedule already validated
#[derive(Debug, Clone)]
pub struct EcoModeEvaluator {
    windows: Vec<ScheduledWindow>,
    recurring: Vec<RecurringRule>,
    intensity: Option<IntensityDurationRule>,
}

impl EcoModeEvaluator {
    /// Parse all schedule rules of `policy`, failing on the first malformed one
    pub fn compile(policy: &EcoPolicy) -> Result<Self, DecisionError> {
        let windows = policy
            .custom_schedule
            .iter()
            .map(|rule| {
                Ok(ScheduledWindow {
                    start: parse_instant(&rule.start)?,
                    end: parse_instant(&rule.end)?,
                })
            })
            .collect::<Result<Vec<_>, DecisionError>>()?;

        let recurring = policy
            .recurring_schedule
            .iter()
            .map(|expression| RecurringRule::parse(expression))
            .collect::<Result<Vec<_>, DecisionError>>()?;

        Ok(Self {
            windows,
            recurring,
            intensity: policy.carbon_intensity_duration.clone(),
        })
    }

    /// Compile `policy` and check it at `now`
    pub fn evaluate(
        now: DateTime<Utc>,
        policy: &EcoPolicy,
        series: &[ForecastSample],
    ) -> Result<Option<OverrideResult>, DecisionError> {
        Ok(Self::compile(policy)?.check(now, series))
    }

    /// Return the first active override, or `None` while eco mode stays on
    pub fn check(&self, now: DateTime<Utc>, series: &[ForecastSample]) -> Option<OverrideResult> {
        let result = self
            .check_custom_schedule(now)
            .or_else(|| self.check_recurring_schedule(now))
            .or_else(|| self.check_intensity_duration(now, series));

        if let Some(result) = &result {
            debug!(trigger = %result.trigger, reason = %result.reason, "Eco mode override active");
        }
        result
    }

    fn check_custom_schedule(&self, now: DateTime<Utc>) -> Option<OverrideResult> {
        let window = self.windows.iter().find(|window| window.contains(now))?;

        // Wake just past the end so the next tick sees the window closed
        let wake_at = window.end + ChronoDuration::microseconds(1);
        Some(
            OverrideResult::new(
                OverrideTrigger::CustomSchedule,
                format!(
                    "custom schedule from {} to {}",
                    window.start.to_rfc3339(),
                    window.end.to_rfc3339()
                ),
            )
            .with_wake_delay(until(now, wake_at)),
        )
    }

    fn check_recurring_schedule(&self, now: DateTime<Utc>) -> Option<OverrideResult> {
        self.recurring.iter().find_map(|rule| {
            let next = rule.next_firing(now)?;
            if next - now > ChronoDuration::minutes(1) {
                return None;
            }

            // Stay off until the last firing of the day has passed
            let last = rule.last_firing_same_day(next);
            let wake_at = last + ChronoDuration::minutes(1) + ChronoDuration::nanoseconds(1);
            Some(
                OverrideResult::new(
                    OverrideTrigger::RecurringSchedule,
                    format!("recurring schedule \"{}\"", rule.expression()),
                )
                .with_wake_delay(until(now, wake_at)),
            )
        })
    }

    fn check_intensity_duration(
        &self,
        now: DateTime<Utc>,
        series: &[ForecastSample],
    ) -> Option<OverrideResult> {
        let rule = self.intensity.as_ref()?;
        if rule.duration_minutes == 0 {
            return None;
        }

        // Minutes without a covering sample are skipped, so any gap keeps eco mode on
        let meets_threshold = (0..rule.duration_minutes)
            .filter_map(|minute| {
                find_sample(series, now - ChronoDuration::minutes(i64::from(minute)))
            })
            .filter(|sample| sample.intensity >= rule.threshold)
            .count();

        if meets_threshold != rule.duration_minutes as usize {
            return None;
        }

        Some(OverrideResult::new(
            OverrideTrigger::IntensityDuration,
            format!(
                "carbon intensity >= threshold of {} for the last {}m",
                rule.threshold, rule.duration_minutes
            ),
        ))
    }
}

/// Parse an RFC 3339 timestamp and normalize it to UTC
fn parse_instant(input: &str) -> Result<DateTime<Utc>, DecisionError> {
    DateTime::parse_from_rfc3339(input)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| DecisionError::schedule(input, e))
}

fn until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or_default()
}
