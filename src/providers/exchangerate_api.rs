use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::{RateTable, RateTableProvider};

/// Client for the `/v4/latest/{base}` endpoint of exchangerate-api.com.
pub struct ExchangeRateApiProvider {
    base_url: Url,
    client: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid provider base URL: {base_url}"))?;
        let client = Client::builder()
            .user_agent("fxproxy/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(ExchangeRateApiProvider { base_url, client })
    }

    fn latest_url(&self, base: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Provider base URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["v4", "latest", base]);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: RateTable,
}

#[async_trait]
impl RateTableProvider for ExchangeRateApiProvider {
    #[instrument(name = "RateTableFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateTable> {
        let url = self.latest_url(base)?;
        debug!("Requesting rate table from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {} URL: {}", e, base, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        debug!(currencies = data.rates.len(), "Received rate table");
        Ok(data.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(mock_server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&mock_server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_table_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "base": "USD",
            "date": "2024-01-02",
            "time_last_updated": 1704153601,
            "rates": {
                "USD": 1,
                "EUR": 0.9,
                "INR": 83.2
            }
        }"#;

        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let rates = provider(&mock_server)
            .fetch_rates("USD")
            .await
            .expect("Failed to get rates");
        assert_eq!(rates.len(), 3);
        assert_eq!(rates["EUR"], 0.9);
        assert_eq!(rates["USD"], 1.0);
    }

    #[tokio::test]
    async fn test_base_currency_is_path_encoded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/US%2FD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rates": {}}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rates = provider(&mock_server).fetch_rates("US/D").await.unwrap();
        assert!(rates.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/XYZ"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).fetch_rates("XYZ").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 404 Not Found for base currency: XYZ"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).fetch_rates("USD").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_missing_rates_field() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"result": "error"}"#),
            )
            .mount(&mock_server)
            .await;

        assert!(provider(&mock_server).fetch_rates("USD").await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"rates": {"EUR": 0.9}}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), Duration::from_millis(200)).unwrap();
        let result = provider.fetch_rates("USD").await;
        assert!(result.unwrap_err().to_string().starts_with("Request error"));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ExchangeRateApiProvider::new("not a url", Duration::from_secs(1));
        assert!(result.is_err());
    }
}
