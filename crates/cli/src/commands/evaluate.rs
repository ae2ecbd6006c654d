//! Offline policy evaluation commands

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use colored::Colorize;
use scaler_lib::{
    forecast::ForecastSource, DecisionOrchestrator, EcoPolicy, ForecastSample,
    JsonFileForecastSource, OverrideTrigger, ReplicaBandResolver, WakeScheduler,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{color_eco_mode, format_duration, print_heading, print_json, OutputFormat};

/// Parse an RFC3339 instant from the command line
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC3339 timestamp: {}", e))
}

#[derive(Serialize)]
struct DecisionView {
    evaluated_at: DateTime<Utc>,
    max_replicas: u32,
    overridden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    trigger: Option<OverrideTrigger>,
    reason: String,
    next_evaluation_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    intensity: Option<f64>,
}

/// Evaluate a policy against a forecast file
pub async fn evaluate(
    policy_path: &Path,
    forecast_path: &Path,
    now: Option<DateTime<Utc>>,
    desired: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let policy = EcoPolicy::from_path(policy_path)?;
    let series = JsonFileForecastSource::new(forecast_path).fetch().await?;
    let now = now.unwrap_or_else(Utc::now);

    let decision = DecisionOrchestrator::new()
        .evaluate(now, &policy, &series, desired)
        .context("Policy evaluation failed")?;
    let intensity = scaler_lib::find_sample(&series, now).map(|sample| sample.intensity);

    let view = DecisionView {
        evaluated_at: now,
        max_replicas: decision.max_replicas,
        overridden: decision.overridden,
        trigger: decision.trigger,
        reason: decision.reason,
        next_evaluation_secs: decision.next_evaluation_delay.as_secs_f64(),
        intensity,
    };

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            print_heading("Scaling Decision");
            println!("Evaluated at:  {}", view.evaluated_at.to_rfc3339().cyan());
            println!("Max replicas:  {}", view.max_replicas.to_string().bold());
            println!("Eco mode:      {}", color_eco_mode(view.overridden));
            if let Some(trigger) = view.trigger {
                println!("Trigger:       {}", trigger);
            }
            println!("Reason:        {}", view.reason);
            if let Some(intensity) = view.intensity {
                println!("Intensity:     {}", intensity);
            }
            let delay = decision.next_evaluation_delay;
            let next = ChronoDuration::from_std(delay)
                .map(|d| (now + d).to_rfc3339())
                .unwrap_or_default();
            println!("Next check:    in {} ({})", format_duration(delay), next);
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct BandRow {
    #[tabled(rename = "Intensity up to")]
    upper_threshold: f64,
    #[tabled(rename = "Max replicas")]
    max_replicas: u32,
    #[tabled(rename = "Selected")]
    selected: String,
}

#[derive(Serialize)]
struct BandView {
    intensity: f64,
    max_replicas: u32,
}

/// Resolve the band a single intensity falls into
pub fn band(policy_path: &Path, intensity: f64, format: OutputFormat) -> Result<()> {
    let policy = EcoPolicy::from_path(policy_path)?;
    let sample = ForecastSample::new(Utc::now(), 1, intensity);
    let chosen = ReplicaBandResolver::select(Some(&sample), &policy.intensity_bands)
        .context("Band resolution failed")?;
    let max_replicas = chosen.max_replicas;

    match format {
        OutputFormat::Json => print_json(&BandView {
            intensity,
            max_replicas,
        })?,
        OutputFormat::Table => {
            let rows: Vec<BandRow> = ReplicaBandResolver::sorted(&policy.intensity_bands)
                .into_iter()
                .map(|band| BandRow {
                    upper_threshold: band.upper_threshold,
                    max_replicas: band.max_replicas,
                    selected: if std::ptr::eq(band, chosen) {
                        "✓".green().to_string()
                    } else {
                        String::new()
                    },
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!(
                "\nIntensity {} selects max replicas {}",
                intensity,
                max_replicas.to_string().bold()
            );
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct TickView {
    now: DateTime<Utc>,
    granularity_minutes: u32,
    delay_secs: f64,
    next_evaluation_at: DateTime<Utc>,
}

/// Show when the next aligned evaluation falls
pub fn next_tick(granularity: u32, now: Option<DateTime<Utc>>, format: OutputFormat) -> Result<()> {
    let now = now.unwrap_or_else(Utc::now);
    let delay = WakeScheduler::next_tick(now, granularity);
    let next = now + ChronoDuration::from_std(delay).context("Delay out of range")?;

    match format {
        OutputFormat::Json => print_json(&TickView {
            now,
            granularity_minutes: granularity,
            delay_secs: delay.as_secs_f64(),
            next_evaluation_at: next,
        })?,
        OutputFormat::Table => {
            println!(
                "Next {}-minute boundary in {} at {}",
                granularity.max(1),
                format_duration(delay).bold(),
                next.to_rfc3339().cyan()
            );
        }
    }

    Ok(())
}
