use super::ui;
use crate::core::credits;
use crate::core::pricing::{BalanceView, PricingService};
use comfy_table::Cell;

impl BalanceView {
    pub fn display_as_table(&self) -> String {
        let table = ui::key_value_table(vec![
            ("Credits", Cell::new(format!("{:.0}", self.credits))),
            ("Balance (EUR)", ui::amount_cell(self.balance_eur, 2)),
            ("Balance (USD)", ui::amount_cell(self.balance_usd, 2)),
            ("Exchange rate (EUR per USD)", ui::amount_cell(self.exchange_rate, 4)),
        ]);

        format!(
            "{}\n\n{}",
            ui::style_text("Balance", ui::StyleType::Title),
            table
        )
    }
}

pub async fn run(service: &PricingService, credits: f64) -> String {
    service.balance(credits).await.display_as_table()
}

/// Converts between credits and EUR; `from_eur` reads `amount` as EUR.
pub fn convert(amount: f64, from_eur: bool) -> String {
    if from_eur {
        format!("EUR {amount} = {} credits", credits::eur_to_credits(amount))
    } else {
        format!("{amount} credits = EUR {}", credits::credits_to_eur(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::tests::ScriptedProvider;
    use crate::core::config::PricingConfig;
    use std::sync::Arc;

    #[test]
    fn test_convert_both_directions() {
        assert_eq!(convert(2_500_000.0, false), "2500000 credits = EUR 2.5");
        assert_eq!(convert(2.5, true), "EUR 2.5 = 2500000 credits");
    }

    #[tokio::test]
    async fn test_balance_table() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(0.92)]));
        let service = PricingService::new(PricingConfig::default(), provider).unwrap();

        let output = run(&service, 2_500_000.0).await;
        assert!(output.contains("2500000"));
        assert!(output.contains("2.50"));
        assert!(output.contains("2.72"));
    }
}
