//! Currency conversion abstractions

use crate::core::error::Result;
use async_trait::async_trait;

pub const USD: &str = "USD";
pub const EUR: &str = "EUR";

/// An external source of exchange rates.
///
/// `get_rate("USD", "EUR")` returns how many EUR one USD buys. Implementations
/// make a single attempt per call and report transport problems as
/// `RateSourceUnavailable` and unusable payloads as `RateSourceMalformed`.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}
