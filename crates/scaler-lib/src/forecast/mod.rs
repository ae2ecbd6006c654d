//! Carbon intensity forecast sources
//!
//! This module provides the sources the reconciler fetches a forecast series
//! from before each evaluation:
//! - a JSON file (the exported content of a forecast ConfigMap key)
//! - a synthetic mock series for demos and tests

mod file;
mod mock;

pub use file::JsonFileForecastSource;
pub use mock::{MockForecastSource, MOCK_INTENSITY_RANGE};

use crate::error::ForecastError;
use crate::models::ForecastSeries;
use std::path::Path;
use std::sync::Arc;

pub use async_trait::async_trait;

/// Trait for forecast retrieval implementations
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch the current forecast series
    async fn fetch(&self) -> Result<ForecastSeries, ForecastError>;

    /// Human readable description for logs and events
    fn describe(&self) -> String;
}

/// Pick the forecast source from configuration
pub fn create_source(mock: bool, path: Option<&Path>) -> Option<Arc<dyn ForecastSource>> {
    if mock {
        tracing::info!("Using mock carbon forecast");
        return Some(Arc::new(MockForecastSource::new()));
    }

    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using carbon forecast from file");
            Some(Arc::new(JsonFileForecastSource::new(path)))
        }
        None => {
            tracing::warn!("No carbon forecast source configured");
            None
        }
    }
}
