//! API client for querying a running carbon-scaler

use anyhow::{Context, Result};
use reqwest::Client;
use scaler_lib::ReconcileReport;
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the scaler's HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Latest reconcile report of the scaler
    pub async fn decision(&self) -> Result<ReconcileReport> {
        self.get("decision").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_joins_paths_onto_base() {
        let client = ApiClient::new("http://scaler.local:8080/").unwrap();
        let url = client.base_url.join("decision").unwrap();
        assert_eq!(url.as_str(), "http://scaler.local:8080/decision");
    }
}
