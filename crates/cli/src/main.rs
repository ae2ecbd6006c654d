//! Carbon Aware Scaler CLI
//!
//! A command-line tool for evaluating eco policies offline and
//! inspecting a running carbon-scaler.

mod client;
mod commands;
mod output;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{evaluate, status};
use std::path::PathBuf;

/// Carbon Aware Scaler CLI
#[derive(Parser)]
#[command(name = "cas")]
#[command(author, version, about = "CLI for the Carbon Aware Scaler", long_about = None)]
pub struct Cli {
    /// Scaler API URL (can also be set via CAS_API_URL env var)
    #[arg(long, env = "CAS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a policy against a forecast file
    Evaluate {
        /// Eco policy JSON document
        #[arg(long)]
        policy: PathBuf,

        /// Forecast JSON file
        #[arg(long)]
        forecast: PathBuf,

        /// Evaluation instant (RFC3339, defaults to now)
        #[arg(long, value_parser = evaluate::parse_instant)]
        now: Option<DateTime<Utc>>,

        /// Replicas the autoscaler currently desires
        #[arg(long)]
        desired: Option<u32>,
    },

    /// Show which band an intensity falls into
    Band {
        /// Eco policy JSON document
        #[arg(long)]
        policy: PathBuf,

        /// Carbon intensity to resolve
        #[arg(long, allow_negative_numbers = true)]
        intensity: f64,
    },

    /// Show the next aligned evaluation time
    NextTick {
        /// Boundary granularity in minutes
        #[arg(long, default_value_t = 5)]
        granularity: u32,

        /// Reference instant (RFC3339, defaults to now)
        #[arg(long, value_parser = evaluate::parse_instant)]
        now: Option<DateTime<Utc>>,
    },

    /// Show the latest decision of a running scaler
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            policy,
            forecast,
            now,
            desired,
        } => {
            evaluate::evaluate(&policy, &forecast, now, desired, cli.format).await?;
        }
        Commands::Band { policy, intensity } => {
            evaluate::band(&policy, intensity, cli.format)?;
        }
        Commands::NextTick { granularity, now } => {
            evaluate::next_tick(granularity, now, cli.format)?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
