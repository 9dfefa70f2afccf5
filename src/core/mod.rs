//! Core pricing logic and abstractions

pub mod cache;
pub mod config;
pub mod credits;
pub mod currency;
pub mod error;
pub mod log;
pub mod pricing;

// Re-export main types for cleaner imports
pub use cache::{ExchangeRateCache, RateCacheEntry, RateSource};
pub use currency::CurrencyRateProvider;
pub use error::PricingError;
pub use pricing::{
    BalanceView, CostBreakdown, CostRequest, PricingService, PricingSnapshot, TransactionRecord,
};
