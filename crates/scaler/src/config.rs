//! Scaler configuration

use anyhow::{Context, Result};
use scaler_lib::{EcoPolicy, TargetKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory, any supported extension
const CONFIG_FILE: &str = "carbon-scaler";

const ENV_PREFIX: &str = "SCALER";

/// Scaler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerConfig {
    /// Name used for metric labels and log events
    #[serde(default = "default_scaler_name")]
    pub scaler_name: String,

    /// API server port for health/metrics/decision
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// JSON document holding the eco policy
    #[serde(default = "default_policy_path")]
    pub policy_path: PathBuf,

    /// JSON forecast file, used unless `mock_forecast` is set
    #[serde(default)]
    pub forecast_path: Option<PathBuf>,

    #[serde(default)]
    pub mock_forecast: bool,

    #[serde(default = "default_target_name")]
    pub target_name: String,

    #[serde(default)]
    pub target_kind: TargetKind,

    /// Replica counts the dry-run target reports
    #[serde(default)]
    pub target_current_replicas: Option<u32>,

    #[serde(default)]
    pub target_desired_replicas: Option<u32>,

    /// Tick granularity when no forecast sample covers now
    #[serde(default = "default_fallback_granularity")]
    pub fallback_granularity_minutes: u32,
}

fn default_scaler_name() -> String {
    "carbon-scaler".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_policy_path() -> PathBuf {
    PathBuf::from("policy.json")
}

fn default_target_name() -> String {
    "workload".to_string()
}

fn default_fallback_granularity() -> u32 {
    scaler_lib::decision::DEFAULT_GRANULARITY_MINUTES
}

impl ScalerConfig {
    /// Load configuration from the optional config file and `SCALER_*` environment
    pub fn load() -> Result<Self> {
        Self::from_sources(None, None)
    }

    /// Load from an explicit file and environment map
    ///
    /// `None` falls back to the default config file and the process environment.
    pub fn from_sources(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("failed to read scaler configuration")?;

        config
            .try_deserialize()
            .context("invalid scaler configuration")
    }

    /// Read the eco policy referenced by `policy_path`
    pub fn load_policy(&self) -> Result<EcoPolicy> {
        EcoPolicy::from_path(&self.policy_path).context("unable to load eco policy")
    }
}
