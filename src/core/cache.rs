//! Single-entry USD to EUR exchange rate cache.

use crate::core::currency::{CurrencyRateProvider, EUR, USD};
use crate::core::error::{PricingError, Result};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the cached rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Fetched,
    Fallback,
    Manual,
}

/// A cached rate and the moment it was stored. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateCacheEntry {
    /// EUR per 1 USD. Always greater than zero.
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    pub source: RateSource,
}

/// Holds the process-wide exchange rate.
///
/// Readers never block: the entry sits behind an `ArcSwapOption` and every
/// update stores a fresh `Arc`. Concurrent misses may each hit the rate
/// source; the last write wins.
pub struct ExchangeRateCache {
    entry: ArcSwapOption<RateCacheEntry>,
    provider: Arc<dyn CurrencyRateProvider>,
    validity: TimeDelta,
    fallback_rate: f64,
}

impl ExchangeRateCache {
    pub fn new(
        provider: Arc<dyn CurrencyRateProvider>,
        validity: Duration,
        fallback_rate: f64,
    ) -> Result<Self> {
        let validity = TimeDelta::from_std(validity).map_err(|e| {
            PricingError::InvalidConfiguration(format!("cache validity out of range: {e}"))
        })?;
        if validity <= TimeDelta::zero() {
            return Err(PricingError::InvalidConfiguration(
                "cache validity must be greater than zero".to_string(),
            ));
        }
        if !is_usable_rate(fallback_rate) {
            return Err(PricingError::InvalidConfiguration(format!(
                "fallback rate must be a positive number, got {fallback_rate}"
            )));
        }

        Ok(Self {
            entry: ArcSwapOption::empty(),
            provider,
            validity,
            fallback_rate,
        })
    }

    /// Returns the current rate, refreshing it from the provider when stale.
    ///
    /// Never fails: a provider error or an unusable rate caches and returns the
    /// fallback rate for a full validity window.
    pub async fn get_rate(&self) -> f64 {
        if let Some(entry) = self.fresh_entry() {
            debug!(rate = entry.rate, source = ?entry.source, "Using cached exchange rate");
            return entry.rate;
        }

        debug!("Exchange rate cache miss");
        match self.provider.get_rate(USD, EUR).await {
            Ok(rate) if is_usable_rate(rate) => {
                let entry = self.store(rate, RateSource::Fetched);
                info!(
                    rate,
                    timestamp = %entry.fetched_at.to_rfc3339(),
                    "Exchange rate updated"
                );
                rate
            }
            Ok(rate) => {
                let error = PricingError::RateSourceMalformed(format!("unusable rate {rate}"));
                self.store_fallback(&error)
            }
            Err(error) => self.store_fallback(&error),
        }
    }

    /// Overrides the cached rate until the validity window lapses or the
    /// rate is overridden again.
    pub fn set_rate(&self, rate: f64) -> Result<()> {
        if !is_usable_rate(rate) {
            return Err(PricingError::InvalidInput(format!(
                "exchange rate must be a positive number, got {rate}"
            )));
        }
        self.store(rate, RateSource::Manual);
        info!(rate, "Exchange rate manually set");
        Ok(())
    }

    /// True while a cached entry exists and is inside the validity window.
    pub fn is_valid(&self) -> bool {
        self.fresh_entry().is_some()
    }

    /// The current entry, fresh or not.
    pub fn entry(&self) -> Option<RateCacheEntry> {
        self.entry.load_full().map(|entry| (*entry).clone())
    }

    fn fresh_entry(&self) -> Option<Arc<RateCacheEntry>> {
        self.entry
            .load_full()
            .filter(|entry| Utc::now().signed_duration_since(entry.fetched_at) < self.validity)
    }

    fn store(&self, rate: f64, source: RateSource) -> Arc<RateCacheEntry> {
        let entry = Arc::new(RateCacheEntry {
            rate,
            fetched_at: Utc::now(),
            source,
        });
        self.entry.store(Some(Arc::clone(&entry)));
        entry
    }

    fn store_fallback(&self, error: &PricingError) -> f64 {
        warn!(
            error = %error,
            fallback_rate = self.fallback_rate,
            "Failed to fetch exchange rate, using fallback"
        );
        self.store(self.fallback_rate, RateSource::Fallback);
        self.fallback_rate
    }
}

fn is_usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}
