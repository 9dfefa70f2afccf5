//! EUR-denominated cost calculation for token usage.
//!
//! Costs are computed in USD from the provider's per-million-token rate, then
//! marked up, charged the rebalancing fee and converted to EUR:
//!
//! ```text
//! cost_usd         = (tokens / 1_000_000) * rate_usd
//! cost_with_markup = cost_usd * (1 + provider_markup)
//! cost_with_fees   = cost_with_markup * (1 + rebalancing_fee)
//! cost_eur         = cost_with_fees * exchange_rate
//! ```
//!
//! No step rounds; formatting is left to the caller.

use crate::core::cache::{ExchangeRateCache, RateSource};
use crate::core::config::PricingConfig;
use crate::core::credits;
use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{PricingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const TOKENS_PER_RATE_UNIT: f64 = 1_000_000.0;

/// Token usage to price.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CostRequest {
    pub tokens: u64,
    /// Provider price in USD per 1,000,000 tokens.
    pub rate_usd: f64,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl CostRequest {
    pub fn new(tokens: u64, rate_usd: f64) -> Self {
        Self {
            tokens,
            rate_usd,
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Result of a cost calculation, with the parameters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Provider cost before markup.
    pub cost_usd: f64,
    pub cost_with_markup: f64,
    pub cost_with_fees: f64,
    /// Billable amount.
    pub cost_eur: f64,
    pub exchange_rate: f64,
    pub provider_markup: f64,
    pub rebalancing_fee: f64,
}

/// Transaction fields derived from a priced request, in the stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
    #[serde(rename = "costEUR")]
    pub cost_eur: f64,
    pub exchange_rate: f64,
    pub provider_markup: f64,
    pub rebalancing_fee: f64,
    /// Tokens consumed.
    pub raw_amount: u64,
    /// Credits charged for `cost_eur`.
    pub token_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TransactionRecord {
    pub fn from_breakdown(request: &CostRequest, breakdown: &CostBreakdown) -> Self {
        Self {
            cost_usd: breakdown.cost_usd,
            cost_eur: breakdown.cost_eur,
            exchange_rate: breakdown.exchange_rate,
            provider_markup: breakdown.provider_markup,
            rebalancing_fee: breakdown.rebalancing_fee,
            raw_amount: request.tokens,
            token_value: credits::eur_to_credits(breakdown.cost_eur),
            provider: request.provider.clone(),
            model: request.model.clone(),
            endpoint: None,
            duration_ms: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

/// A credit balance expressed in both currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceView {
    pub credits: f64,
    pub balance_eur: f64,
    pub balance_usd: f64,
    pub exchange_rate: f64,
}

/// Diagnostic view of the configuration and the cached rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub provider_markup: f64,
    pub rebalancing_fee: f64,
    pub fallback_rate: f64,
    pub cache_validity_secs: u64,
    pub exchange_rate: Option<f64>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub rate_source: Option<RateSource>,
    pub rate_is_fresh: bool,
}

/// Prices token usage in EUR.
///
/// Build one per process and share it; clones share the same exchange rate
/// cache.
#[derive(Clone)]
pub struct PricingService {
    config: PricingConfig,
    rates: Arc<ExchangeRateCache>,
}

impl PricingService {
    pub fn new(config: PricingConfig, provider: Arc<dyn CurrencyRateProvider>) -> Result<Self> {
        config.validate()?;
        let rates = ExchangeRateCache::new(provider, config.cache_validity(), config.fallback_rate)?;

        info!(
            provider_markup = %format!("{}%", config.provider_markup * 100.0),
            rebalancing_fee = %format!("{}%", config.rebalancing_fee * 100.0),
            fallback_rate = config.fallback_rate,
            "Pricing service initialized"
        );

        Ok(Self {
            config,
            rates: Arc::new(rates),
        })
    }

    #[instrument(
        name = "CalculateCost",
        skip(self, request),
        fields(provider = ?request.provider, model = ?request.model)
    )]
    pub async fn calculate_cost(&self, request: &CostRequest) -> Result<CostBreakdown> {
        if !request.rate_usd.is_finite() || request.rate_usd < 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "rate_usd must be a non-negative number, got {}",
                request.rate_usd
            )));
        }

        let cost_usd = (request.tokens as f64 / TOKENS_PER_RATE_UNIT) * request.rate_usd;
        let exchange_rate = self.rates.get_rate().await;
        let cost_with_markup = cost_usd * (1.0 + self.config.provider_markup);
        let cost_with_fees = cost_with_markup * (1.0 + self.config.rebalancing_fee);
        let cost_eur = cost_with_fees * exchange_rate;

        debug!(
            tokens = request.tokens,
            rate_usd = request.rate_usd,
            cost_usd = %format!("{cost_usd:.6}"),
            provider_markup = self.config.provider_markup,
            cost_with_markup = %format!("{cost_with_markup:.6}"),
            rebalancing_fee = self.config.rebalancing_fee,
            cost_with_fees = %format!("{cost_with_fees:.6}"),
            exchange_rate,
            cost_eur = %format!("{cost_eur:.6}"),
            "Cost calculation"
        );

        Ok(CostBreakdown {
            cost_usd,
            cost_with_markup,
            cost_with_fees,
            cost_eur,
            exchange_rate,
            provider_markup: self.config.provider_markup,
            rebalancing_fee: self.config.rebalancing_fee,
        })
    }

    /// Prices `request` and returns the record the storage layer persists.
    pub async fn record_usage(
        &self,
        request: &CostRequest,
        endpoint: Option<&str>,
        duration: Option<Duration>,
    ) -> Result<TransactionRecord> {
        let breakdown = self.calculate_cost(request).await?;
        let mut record = TransactionRecord::from_breakdown(request, &breakdown);
        if let Some(endpoint) = endpoint {
            record = record.with_endpoint(endpoint);
        }
        if let Some(duration) = duration {
            record = record.with_duration(duration);
        }
        Ok(record)
    }

    /// Current EUR per 1 USD.
    pub async fn get_exchange_rate(&self) -> f64 {
        self.rates.get_rate().await
    }

    pub fn set_exchange_rate(&self, rate: f64) -> Result<()> {
        self.rates.set_rate(rate)
    }

    pub fn credits_to_eur(&self, credits: f64) -> f64 {
        credits::credits_to_eur(credits)
    }

    pub fn eur_to_credits(&self, eur: f64) -> f64 {
        credits::eur_to_credits(eur)
    }

    pub async fn balance(&self, credits: f64) -> BalanceView {
        let balance_eur = credits::credits_to_eur(credits);
        let exchange_rate = self.rates.get_rate().await;
        BalanceView {
            credits,
            balance_eur,
            balance_usd: balance_eur / exchange_rate,
            exchange_rate,
        }
    }

    pub fn get_config(&self) -> PricingSnapshot {
        let entry = self.rates.entry();
        PricingSnapshot {
            provider_markup: self.config.provider_markup,
            rebalancing_fee: self.config.rebalancing_fee,
            fallback_rate: self.config.fallback_rate,
            cache_validity_secs: self.config.cache_validity_secs,
            exchange_rate: entry.as_ref().map(|e| e.rate),
            last_fetch: entry.as_ref().map(|e| e.fetched_at),
            rate_source: entry.as_ref().map(|e| e.source),
            rate_is_fresh: self.rates.is_valid(),
        }
    }
}
