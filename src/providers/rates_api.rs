use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::rates::{RateSource, RawRates};

/// Rates endpoint: `GET {base_url}/api/rates?base=<CODE>`.
pub struct RatesApiSource {
    base_url: String,
    client: reqwest::Client,
}

impl RatesApiSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pricelens/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: RawRates,
    #[serde(default)]
    base: Option<String>,
}

#[async_trait]
impl RateSource for RatesApiSource {
    #[instrument(name = "RatesApiFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RawRates> {
        let url = format!("{}/api/rates?base={}", self.base_url, base);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: RatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse rates response for {}: {}", base, e))?;

        if let Some(reported) = data.base.as_deref() {
            if reported != base {
                debug!("Rates API reported base {} for request {}", reported, base);
            }
        }
        Ok(data.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, base: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/api/rates"))
            .and(query_param("base", base))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let server = MockServer::start().await;
        mount(
            &server,
            "TRY",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"base": "TRY", "rates": {"USD": 0.031, "EUR": 0.029}}"#),
        )
        .await;

        let source = RatesApiSource::new(&server.uri()).unwrap();
        let rates = source.fetch_rates("TRY").await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates["USD"], 0.031);
        assert_eq!(rates["EUR"], 0.029);
    }

    #[tokio::test]
    async fn test_missing_rates_field() {
        let server = MockServer::start().await;
        mount(
            &server,
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"base": "USD"}"#),
        )
        .await;

        let source = RatesApiSource::new(&server.uri()).unwrap();
        let result = source.fetch_rates("USD").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse rates response for USD")
        );
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let server = MockServer::start().await;
        mount(
            &server,
            "USD",
            ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
        )
        .await;

        let source = RatesApiSource::new(&server.uri()).unwrap();
        assert!(source.fetch_rates("USD").await.is_err());
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        mount(&server, "EUR", ResponseTemplate::new(500)).await;

        let source = RatesApiSource::new(&server.uri()).unwrap();
        let result = source.fetch_rates("EUR").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for base: EUR"
        );
    }
}
