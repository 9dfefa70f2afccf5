use crate::core::error::{PricingError, Result as PricingResult};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{debug, info};

pub const DEFAULT_PROVIDER_MARKUP: f64 = 0.15;
pub const DEFAULT_REBALANCING_FEE: f64 = 0.025;
pub const DEFAULT_FALLBACK_RATE: f64 = 0.92;
pub const DEFAULT_CACHE_VALIDITY_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_EXCHANGERATE_API_URL: &str = "https://api.exchangerate-api.com";

/// Environment variables that override the pricing section of the config file.
pub const ENV_PROVIDER_MARKUP: &str = "PROVIDER_MARKUP";
pub const ENV_REBALANCING_FEE: &str = "REBALANCING_FEE";
pub const ENV_FALLBACK_EUR_RATE: &str = "FALLBACK_EUR_RATE";

fn default_provider_markup() -> f64 {
    DEFAULT_PROVIDER_MARKUP
}

fn default_rebalancing_fee() -> f64 {
    DEFAULT_REBALANCING_FEE
}

fn default_fallback_rate() -> f64 {
    DEFAULT_FALLBACK_RATE
}

fn default_cache_validity_secs() -> u64 {
    DEFAULT_CACHE_VALIDITY_SECS
}

/// Reads overrides from the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Arithmetic constants of the pricing pipeline. Read once at startup.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PricingConfig {
    /// Margin added to the provider's USD cost, as a fraction (0.15 = 15%).
    #[serde(default = "default_provider_markup")]
    pub provider_markup: f64,
    /// Fee applied after the markup and before currency conversion.
    #[serde(default = "default_rebalancing_fee")]
    pub rebalancing_fee: f64,
    /// EUR per 1 USD used whenever the rate source cannot be used.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f64,
    #[serde(default = "default_cache_validity_secs")]
    pub cache_validity_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            provider_markup: DEFAULT_PROVIDER_MARKUP,
            rebalancing_fee: DEFAULT_REBALANCING_FEE,
            fallback_rate: DEFAULT_FALLBACK_RATE,
            cache_validity_secs: DEFAULT_CACHE_VALIDITY_SECS,
        }
    }
}

impl PricingConfig {
    pub fn cache_validity(&self) -> Duration {
        Duration::from_secs(self.cache_validity_secs)
    }

    /// Overrides fields from environment-style variables.
    ///
    /// `lookup` returns the raw value of a variable, if set. A value that does not
    /// parse as a number is an `InvalidConfiguration` error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> PricingResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut f64); 3] = [
            (ENV_PROVIDER_MARKUP, &mut self.provider_markup),
            (ENV_REBALANCING_FEE, &mut self.rebalancing_fee),
            (ENV_FALLBACK_EUR_RATE, &mut self.fallback_rate),
        ];

        for (name, field) in overrides {
            if let Some(raw) = lookup(name) {
                let value = raw.trim().parse::<f64>().map_err(|e| {
                    PricingError::InvalidConfiguration(format!("{name}={raw:?} is not a number: {e}"))
                })?;
                debug!(variable = name, value, "Applying environment override");
                *field = value;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> PricingResult<()> {
        for (name, value) in [
            ("provider_markup", self.provider_markup),
            ("rebalancing_fee", self.rebalancing_fee),
            ("fallback_rate", self.fallback_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PricingError::InvalidConfiguration(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.fallback_rate <= 0.0 {
            return Err(PricingError::InvalidConfiguration(
                "fallback_rate must be greater than zero".to_string(),
            ));
        }
        if self.cache_validity_secs == 0 {
            return Err(PricingError::InvalidConfiguration(
                "cache_validity_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchangerate_api: Option<ExchangeRateApiConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchangerate_api: Some(ExchangeRateApiConfig {
                base_url: DEFAULT_EXCHANGERATE_API_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults if there is none.
    /// Environment overrides apply in both cases.
    pub fn load() -> Result<Self> {
        Self::load_with(env_lookup)
    }

    /// Like [`AppConfig::load`], reading overrides through `lookup`.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            return Self::load_from_path_with(&config_path, lookup);
        }

        info!(
            path = %config_path.display(),
            "No config file found, using built-in pricing defaults"
        );
        Self::default().finish(lookup)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ai", "aim2balance", "eur-pricing")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::load_from_path_with(path, env_lookup)
    }

    /// Like [`AppConfig::load_from_path`], reading overrides through `lookup`.
    pub fn load_from_path_with<P, F>(path: P, lookup: F) -> Result<Self>
    where
        P: AsRef<std::path::Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        let config = config.finish(lookup)?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies overrides from `lookup` and validates the result.
    pub fn finish<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.pricing
            .apply_env_overrides(lookup)
            .context("Failed to apply pricing overrides from environment")?;
        self.pricing
            .validate()
            .context("Pricing configuration is unusable")?;
        Ok(self)
    }

    pub fn exchangerate_api_url(&self) -> &str {
        self.providers
            .exchangerate_api
            .as_ref()
            .map_or(DEFAULT_EXCHANGERATE_API_URL, |p| &p.base_url)
    }
}
