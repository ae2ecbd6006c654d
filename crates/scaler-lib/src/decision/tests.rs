//! Cross-component tests for the decision engine

use super::*;
use crate::models::{
    find_sample, EcoPolicy, ForecastSample, IntensityBand, IntensityDurationRule,
    OverrideTrigger,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::thread;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 8, 22, 0).unwrap()
}

fn five_minute_series(start: DateTime<Utc>, intensities: &[f64]) -> Vec<ForecastSample> {
    intensities
        .iter()
        .enumerate()
        .map(|(i, intensity)| {
            ForecastSample::new(start + ChronoDuration::minutes(5 * i as i64), 5, *intensity)
        })
        .collect()
}

fn full_policy() -> EcoPolicy {
    EcoPolicy {
        custom_schedule: vec![],
        recurring_schedule: vec!["0 2 * * *".to_string()],
        carbon_intensity_duration: Some(IntensityDurationRule {
            threshold: 550.0,
            duration_minutes: 30,
        }),
        default_max_replicas: 40,
        intensity_bands: vec![
            IntensityBand::new(600.0, 3),
            IntensityBand::new(200.0, 30),
            IntensityBand::new(400.0, 12),
        ],
    }
}

#[test]
fn test_identical_inputs_give_identical_decisions() {
    let series = five_minute_series(now() - ChronoDuration::hours(1), &[350.0; 24]);
    let orchestrator = DecisionOrchestrator::new();

    let first = orchestrator.evaluate(now(), &full_policy(), &series, Some(4));
    let second = orchestrator.evaluate(now(), &full_policy(), &series, Some(4));

    assert_eq!(first, second);
    let decision = first.unwrap();
    assert_eq!(decision.max_replicas, 12);
    assert!(!decision.overridden);
}

#[test]
fn test_overlapping_samples_resolve_to_first_in_series() {
    // Two samples cover 08:22; iteration order decides, not chronology or width
    let series = vec![
        ForecastSample::new(now() - ChronoDuration::minutes(2), 5, 150.0),
        ForecastSample::new(now() - ChronoDuration::minutes(20), 60, 500.0),
    ];
    assert_eq!(find_sample(&series, now()).unwrap().intensity, 150.0);

    let decision = DecisionOrchestrator::new()
        .evaluate(now(), &full_policy(), &series, None)
        .unwrap();
    assert_eq!(decision.max_replicas, 30);

    let reversed: Vec<_> = series.iter().rev().cloned().collect();
    let decision = DecisionOrchestrator::new()
        .evaluate(now(), &full_policy(), &reversed, None)
        .unwrap();
    assert_eq!(decision.max_replicas, 3);
}

#[test]
fn test_sustained_high_intensity_disables_eco_mode() {
    let series = five_minute_series(now() - ChronoDuration::hours(1), &[580.0; 24]);
    let decision = DecisionOrchestrator::new()
        .evaluate(now(), &full_policy(), &series, None)
        .unwrap();

    assert!(decision.overridden);
    assert_eq!(decision.trigger, Some(OverrideTrigger::IntensityDuration));
    assert_eq!(decision.max_replicas, 40);
}

#[test]
fn test_sustained_rule_needs_full_coverage() {
    // Forecast only starts 10 minutes ago, the rule looks back 30
    let series = five_minute_series(now() - ChronoDuration::minutes(10), &[580.0; 6]);
    let decision = DecisionOrchestrator::new()
        .evaluate(now(), &full_policy(), &series, None)
        .unwrap();

    assert!(!decision.overridden);
    assert_eq!(decision.max_replicas, 3);
}

#[test]
fn test_recurring_window_preempts_sustained_intensity() {
    let at = Utc.with_ymd_and_hms(2024, 6, 12, 1, 59, 30).unwrap();
    let series = five_minute_series(at - ChronoDuration::hours(1), &[580.0; 24]);
    let decision = DecisionOrchestrator::new()
        .evaluate(at, &full_policy(), &series, None)
        .unwrap();

    assert_eq!(decision.trigger, Some(OverrideTrigger::RecurringSchedule));
    // Only firing today is 02:00; wake at 02:01 plus a tick
    assert_eq!(
        decision.next_evaluation_delay,
        std::time::Duration::from_secs(90) + std::time::Duration::from_nanos(1)
    );
}

#[test]
fn test_concurrent_evaluations_share_policy() {
    let policy = Arc::new(full_policy());
    let series = Arc::new(five_minute_series(
        now() - ChronoDuration::hours(1),
        &[350.0; 24],
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let policy = Arc::clone(&policy);
            let series = Arc::clone(&series);
            thread::spawn(move || {
                DecisionOrchestrator::new()
                    .evaluate(now(), &policy, &series, None)
                    .map(|decision| decision.max_replicas)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(12));
    }
    // Bands are still in their original, unsorted order
    assert_eq!(policy.intensity_bands[0].upper_threshold, 600.0);
}
