//! Pricing error types.

use thiserror::Error;

/// Errors raised by the pricing core.
///
/// Rate source failures never reach a cost calculation: the exchange rate
/// cache recovers from them with the configured fallback rate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Network or transport failure talking to the rate source.
    #[error("Rate source unavailable: {0}")]
    RateSourceUnavailable(String),

    /// The rate source answered, but without a usable rate.
    #[error("Rate source returned malformed data: {0}")]
    RateSourceMalformed(String),

    /// Missing or unusable pricing configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Rejected calculation or override input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, PricingError>;
