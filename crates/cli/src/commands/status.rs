//! Live status of a running scaler

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{
    color_condition, color_eco_mode, format_duration, print_heading, print_json, print_warning,
    OutputFormat,
};

/// Show the scaler's latest reconcile report
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.decision().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_heading("Carbon Aware Scaler Status");
            println!("Scaler:        {}", report.scaler.cyan());
            println!("Evaluated at:  {}", report.evaluated_at.to_rfc3339());
            println!("Condition:     {}", color_condition(report.condition));
            println!("Max replicas:  {}", report.max_replicas.to_string().bold());
            println!("Eco mode:      {}", color_eco_mode(report.overridden));
            if let Some(trigger) = report.trigger {
                println!("Trigger:       {}", trigger);
            }
            println!("Reason:        {}", report.reason);
            if let Some(intensity) = report.intensity {
                println!("Intensity:     {}", intensity);
            }
            println!(
                "Next check:    in {}",
                format_duration(report.next_evaluation_delay())
            );

            if !report.applied {
                print_warning("The cap was not applied to the scale target");
            }
        }
    }

    Ok(())
}
