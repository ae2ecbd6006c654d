//! Synthetic forecast for demos and local runs

use super::{async_trait, ForecastSource};
use crate::error::ForecastError;
use crate::models::{ForecastSample, ForecastSeries};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use tokio::sync::OnceCell;

/// Intensity range of generated samples
pub const MOCK_INTENSITY_RANGE: Range<f64> = 529.0..580.0;

/// Sample spacing in minutes
const MOCK_STEP_MINUTES: u32 = 5;

/// Samples generated before the first fetch
const MOCK_SAMPLES_BEFORE: i64 = 3;

/// Seven days of five-minute samples
const MOCK_SAMPLES_AFTER: i64 = 7 * 24 * 12;

/// Generates a week-long series on first fetch and serves it afterwards
pub struct MockForecastSource {
    seed: Option<u64>,
    series: OnceCell<ForecastSeries>,
}

impl MockForecastSource {
    pub fn new() -> Self {
        Self {
            seed: None,
            series: OnceCell::new(),
        }
    }

    /// Reproducible intensities
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            series: OnceCell::new(),
        }
    }

    /// Generate the series around `origin`
    pub fn generate(&self, origin: DateTime<Utc>) -> ForecastSeries {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        (-MOCK_SAMPLES_BEFORE..MOCK_SAMPLES_AFTER)
            .map(|i| {
                ForecastSample::new(
                    origin + ChronoDuration::minutes(i * i64::from(MOCK_STEP_MINUTES)),
                    MOCK_STEP_MINUTES,
                    rng.gen_range(MOCK_INTENSITY_RANGE),
                )
            })
            .collect()
    }
}

impl Default for MockForecastSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForecastSource for MockForecastSource {
    async fn fetch(&self) -> Result<ForecastSeries, ForecastError> {
        let series = self
            .series
            .get_or_init(|| async { self.generate(Utc::now()) })
            .await;
        Ok(series.clone())
    }

    fn describe(&self) -> String {
        "mock carbon forecast".to_string()
    }
}
