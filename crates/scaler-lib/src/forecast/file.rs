//! Forecast read from a JSON document on disk

use super::{async_trait, ForecastSource};
use crate::error::ForecastError;
use crate::models::ForecastSeries;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a JSON array of forecast samples on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileForecastSource {
    path: PathBuf,
}

impl JsonFileForecastSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ForecastSource for JsonFileForecastSource {
    async fn fetch(&self) -> Result<ForecastSeries, ForecastError> {
        let path = self.path.display().to_string();
        let content = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ForecastError::Io {
                path: path.clone(),
                source,
            })?;

        let series: ForecastSeries = serde_json::from_slice(&content)
            .map_err(|source| ForecastError::Parse { path, source })?;

        debug!(samples = series.len(), "Loaded carbon forecast");
        Ok(series)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_fetch_valid_forecast() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"timestamp":"2024-03-01T12:00:00Z","duration":5,"value":420.0}},
                {{"timestamp":"2024-03-01T12:05:00Z","duration":5,"value":430.5}}
            ]"#
        )
        .unwrap();

        let source = JsonFileForecastSource::new(file.path());
        let series = source.fetch().await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[1].intensity, 430.5);
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let source = JsonFileForecastSource::new("/nonexistent/forecast.json");
        assert!(matches!(
            source.fetch().await,
            Err(ForecastError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let source = JsonFileForecastSource::new(file.path());
        assert!(matches!(
            source.fetch().await,
            Err(ForecastError::Parse { .. })
        ));
    }
}
