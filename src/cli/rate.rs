use super::ui;
use crate::core::cache::RateSource;
use crate::core::pricing::{PricingService, PricingSnapshot};
use comfy_table::Cell;

fn source_text(source: Option<RateSource>) -> String {
    match source {
        Some(RateSource::Fetched) => "fetched".to_string(),
        Some(RateSource::Fallback) => ui::style_text("fallback", ui::StyleType::Warning),
        Some(RateSource::Manual) => "manual override".to_string(),
        None => "N/A".to_string(),
    }
}

/// Shows the current USD to EUR rate, fetching it if needed.
pub async fn run(service: &PricingService) -> String {
    let rate = service.get_exchange_rate().await;
    let snapshot = service.get_config();

    format!(
        "1 USD = {} EUR  {}",
        ui::style_text(&format!("{rate:.4}"), ui::StyleType::TotalValue),
        ui::style_text(
            &format!("(source: {})", source_text(snapshot.rate_source)),
            ui::StyleType::Subtle
        )
    )
}

impl PricingSnapshot {
    pub fn display_as_table(&self) -> String {
        let table = ui::key_value_table(vec![
            ("Provider markup", ui::percentage_cell(self.provider_markup)),
            ("Rebalancing fee", ui::percentage_cell(self.rebalancing_fee)),
            ("Fallback rate", ui::amount_cell(self.fallback_rate, 4)),
            (
                "Cache validity",
                Cell::new(format!("{}s", self.cache_validity_secs)),
            ),
            (
                "Exchange rate",
                ui::format_optional_cell(self.exchange_rate, |r| format!("{r:.4}")),
            ),
            ("Rate source", Cell::new(source_text(self.rate_source))),
            (
                "Last fetch",
                ui::format_optional_cell(self.last_fetch, |t| t.to_rfc3339()),
            ),
            (
                "Rate fresh",
                Cell::new(if self.rate_is_fresh { "yes" } else { "no" }),
            ),
        ]);

        format!(
            "{}\n\n{}",
            ui::style_text("Pricing configuration", ui::StyleType::Title),
            table
        )
    }
}

/// Shows the configuration snapshot after warming the rate cache.
pub async fn config(service: &PricingService) -> String {
    service.get_exchange_rate().await;
    service.get_config().display_as_table()
}
