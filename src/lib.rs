pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::{AppConfig, env_lookup};
use crate::core::pricing::{CostRequest, PricingService};
use crate::providers::exchangerate_api::ExchangeRateApiProvider;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Quote {
        request: CostRequest,
        exchange_rate: Option<f64>,
        json: bool,
    },
    Rate,
    Credits {
        amount: f64,
        from_eur: bool,
    },
    Balance {
        credits: f64,
    },
    Config,
}

/// Builds the pricing service from `config`, talking to the configured rate source.
pub fn build_service(config: &AppConfig) -> Result<PricingService> {
    let provider = ExchangeRateApiProvider::new(config.exchangerate_api_url())?;
    let service = PricingService::new(config.pricing.clone(), Arc::new(provider))
        .context("Failed to initialize pricing service")?;
    Ok(service)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let output = render_command(command, config_path).await?;
    println!("{output}");
    Ok(())
}

/// Runs `command` and returns what `run_command` would print.
pub async fn render_command(command: AppCommand, config_path: Option<&str>) -> Result<String> {
    render_command_with_env(command, config_path, env_lookup).await
}

/// Like [`render_command`], reading pricing overrides through `lookup`
/// instead of the process environment.
pub async fn render_command_with_env<F>(
    command: AppCommand,
    config_path: Option<&str>,
    lookup: F,
) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    info!("EUR pricing starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path_with(path, lookup)?,
        None => AppConfig::load_with(lookup)?,
    };
    debug!("Loaded config: {config:#?}");

    let service = build_service(&config)?;

    match command {
        AppCommand::Quote {
            request,
            exchange_rate,
            json,
        } => {
            if let Some(rate) = exchange_rate {
                service.set_exchange_rate(rate)?;
            }
            cli::quote::run(&service, &request, json).await
        }
        AppCommand::Rate => Ok(cli::rate::run(&service).await),
        AppCommand::Credits { amount, from_eur } => Ok(cli::balance::convert(amount, from_eur)),
        AppCommand::Balance { credits } => Ok(cli::balance::run(&service, credits).await),
        AppCommand::Config => Ok(cli::rate::config(&service).await),
    }
}
