use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{PricingError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Rate source backed by the exchangerate-api.com `v4/latest` endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("eur-pricing/0.1")
            .build()
            .map_err(|e| PricingError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, serde_json::Value>,
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let url = format!("{}/v4/latest/{}", self.base_url, from);
        debug!("Requesting currency rate from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            PricingError::RateSourceUnavailable(format!("Request error: {e} for {from}{to}"))
        })?;

        if !response.status().is_success() {
            return Err(PricingError::RateSourceUnavailable(format!(
                "HTTP error: {} for {}{}",
                response.status(),
                from,
                to
            )));
        }

        let text = response.text().await.map_err(|e| {
            PricingError::RateSourceUnavailable(format!("Failed to read response body: {e}"))
        })?;

        let data: LatestRatesResponse = serde_json::from_str(&text).map_err(|e| {
            PricingError::RateSourceMalformed(format!(
                "Failed to parse JSON response for {from}: {e}"
            ))
        })?;

        let rate = data
            .rates
            .get(to)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| {
                PricingError::RateSourceMalformed(format!("Missing {to} rate in response"))
            })?;

        if !rate.is_finite() || rate <= 0.0 {
            return Err(PricingError::RateSourceMalformed(format!(
                "Unusable {to} rate in response: {rate}"
            )));
        }

        Ok(rate)
    }
}
