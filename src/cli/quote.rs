use super::ui;
use crate::core::pricing::{CostBreakdown, CostRequest, PricingService, TransactionRecord};
use anyhow::{Context, Result};
use comfy_table::Cell;

impl CostBreakdown {
    pub fn display_as_table(&self, request: &CostRequest) -> String {
        let table = ui::key_value_table(vec![
            ("Tokens", Cell::new(request.tokens)),
            ("Rate (USD / 1M tokens)", ui::amount_cell(request.rate_usd, 4)),
            ("Provider cost (USD)", ui::amount_cell(self.cost_usd, 6)),
            ("Provider markup", ui::percentage_cell(self.provider_markup)),
            ("With markup (USD)", ui::amount_cell(self.cost_with_markup, 6)),
            ("Rebalancing fee", ui::percentage_cell(self.rebalancing_fee)),
            ("With fees (USD)", ui::amount_cell(self.cost_with_fees, 6)),
            ("Exchange rate (EUR per USD)", ui::amount_cell(self.exchange_rate, 4)),
        ]);

        let label = match (&request.provider, &request.model) {
            (Some(provider), Some(model)) => format!("{provider} / {model}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => "Usage".to_string(),
        };

        let mut output = format!(
            "Quote: {}\n\n",
            ui::style_text(&label, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\nTotal ({}): {}  {}",
            ui::style_text("EUR", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.cost_eur), ui::StyleType::TotalValue),
            ui::style_text(
                &format!("(USD {:.2})", self.cost_usd),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}

/// Prices `request`, as a table or as the JSON transaction record.
pub async fn run(service: &PricingService, request: &CostRequest, json: bool) -> Result<String> {
    let breakdown = service
        .calculate_cost(request)
        .await
        .context("Failed to calculate cost")?;

    if json {
        let record = TransactionRecord::from_breakdown(request, &breakdown);
        return serde_json::to_string_pretty(&record).context("Failed to serialize record");
    }
    Ok(breakdown.display_as_table(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::tests::ScriptedProvider;
    use crate::core::config::PricingConfig;
    use std::sync::Arc;

    fn service() -> PricingService {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(0.92)]));
        PricingService::new(PricingConfig::default(), provider).unwrap()
    }

    #[tokio::test]
    async fn test_quote_table_shows_totals() {
        let request = CostRequest::new(1_000_000, 10.0)
            .with_provider("openai")
            .with_model("gpt-4o");

        let output = run(&service(), &request, false).await.unwrap();
        assert!(output.contains("openai / gpt-4o"));
        assert!(output.contains("15.00%"));
        assert!(output.contains("2.50%"));
        assert!(output.contains("10.84"));
        assert!(output.contains("0.9200"));
    }

    #[tokio::test]
    async fn test_quote_json_is_transaction_record() {
        let request = CostRequest::new(1_000_000, 10.0).with_provider("openai");

        let output = run(&service(), &request, true).await.unwrap();
        let record: TransactionRecord = serde_json::from_str(&output).unwrap();
        assert_eq!(record.exchange_rate, 0.92);
        assert!((record.cost_eur - 10.8445).abs() < 1e-9);
        assert_eq!(record.provider.as_deref(), Some("openai"));
    }

    #[tokio::test]
    async fn test_quote_rejects_negative_rate() {
        let err = run(&service(), &CostRequest::new(10, -1.0), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to calculate cost"));
    }
}
