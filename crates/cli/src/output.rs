//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use scaler_lib::ConditionReason;
use serde::Serialize;
use std::time::Duration;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a delay as `1h 2m 3s`, dropping leading zero units
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return format!("{}ms", duration.as_millis());
    }

    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Eco mode state, colored
pub fn color_eco_mode(overridden: bool) -> String {
    if overridden {
        "off".yellow().to_string()
    } else {
        "on".green().to_string()
    }
}

/// Color a reconcile condition by severity
pub fn color_condition(condition: ConditionReason) -> String {
    let text = condition.to_string();
    match condition {
        ConditionReason::Succeeded => text.green().to_string(),
        ConditionReason::EcoModeDisabled => text.yellow().to_string(),
        _ => text.red().to_string(),
    }
}
