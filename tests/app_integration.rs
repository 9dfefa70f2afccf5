use eur_pricing::core::config::AppConfig;
use eur_pricing::core::pricing::{CostRequest, TransactionRecord};
use eur_pricing::{AppCommand, build_service, render_command_with_env};
use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_rates_server(response: ResponseTemplate, expected_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(response)
            .expect(expected_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn rates_body(eur: f64) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"base": "USD", "rates": {{"USD": 1, "EUR": {eur}, "GBP": 0.79}}}}"#
        ))
    }

    /// Keeps the host's pricing variables out of the tests.
    pub fn no_env(_: &str) -> Option<String> {
        None
    }

    pub fn write_config(base_url: &str, extra_pricing: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
pricing:
  provider_markup: 0.15
  rebalancing_fee: 0.025
  fallback_rate: 0.92
{extra_pricing}
providers:
  exchangerate_api:
    base_url: {base_url}
"#
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

async fn render(command: AppCommand, config_path: &str) -> anyhow::Result<String> {
    render_command_with_env(command, Some(config_path), test_utils::no_env).await
}

#[test_log::test(tokio::test)]
async fn test_full_quote_flow_with_mock() {
    let mock_server = test_utils::create_rates_server(test_utils::rates_body(0.92), 1).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");

    let output = render(
        AppCommand::Quote {
            request: CostRequest::new(1_000_000, 10.0).with_provider("openai"),
            exchange_rate: None,
            json: true,
        },
        config_file.path().to_str().unwrap(),
    )
    .await
    .expect("Quote failed");

    info!(%output, "Quote output");
    let record: TransactionRecord = serde_json::from_str(&output).unwrap();
    assert!((record.cost_usd - 10.0).abs() < 1e-9);
    assert!((record.cost_eur - 10.8445).abs() < 1e-9);
    assert_eq!(record.exchange_rate, 0.92);
    assert_eq!(record.provider.as_deref(), Some("openai"));
}

#[test_log::test(tokio::test)]
async fn test_quote_with_rate_override_skips_fetch() {
    let mock_server = test_utils::create_rates_server(test_utils::rates_body(0.5), 0).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");

    let output = render(
        AppCommand::Quote {
            request: CostRequest::new(2_000_000, 5.0),
            exchange_rate: Some(1.1),
            json: true,
        },
        config_file.path().to_str().unwrap(),
    )
    .await
    .unwrap();

    let record: TransactionRecord = serde_json::from_str(&output).unwrap();
    assert_eq!(record.exchange_rate, 1.1);
    let expected = 10.0 * 1.15 * 1.025 * 1.1;
    assert!((record.cost_eur - expected).abs() < 1e-9);
}

#[test_log::test(tokio::test)]
async fn test_rate_falls_back_when_source_fails() {
    let mock_server =
        test_utils::create_rates_server(wiremock::ResponseTemplate::new(503), 1).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");

    let output = render(AppCommand::Rate, config_file.path().to_str().unwrap())
        .await
        .expect("Rate command must not fail on rate source errors");

    assert!(output.contains("0.9200"));
    assert!(output.contains("fallback"));
}

#[test_log::test(tokio::test)]
async fn test_service_fetches_once_per_window() {
    let mock_server = test_utils::create_rates_server(test_utils::rates_body(0.9), 1).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");
    let config = AppConfig::load_from_path_with(config_file.path(), test_utils::no_env).unwrap();
    let service = build_service(&config).unwrap();

    let first = service
        .calculate_cost(&CostRequest::new(1000, 3.0))
        .await
        .unwrap();
    let second = service
        .calculate_cost(&CostRequest::new(5000, 15.0))
        .await
        .unwrap();

    assert_eq!(first.exchange_rate, 0.9);
    assert_eq!(second.exchange_rate, 0.9);
    // MockServer verifies the single expected request on drop
}

#[test_log::test(tokio::test)]
async fn test_fallback_is_not_refetched_within_window() {
    let mock_server =
        test_utils::create_rates_server(test_utils::rates_body(-1.0), 1).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");
    let config = AppConfig::load_from_path_with(config_file.path(), test_utils::no_env).unwrap();
    let service = build_service(&config).unwrap();

    assert_eq!(service.get_exchange_rate().await, 0.92);
    assert_eq!(service.get_exchange_rate().await, 0.92);
    let balance = service.balance(1_000_000.0).await;
    assert_eq!(balance.balance_eur, 1.0);
    assert!((balance.balance_usd - 1.0 / 0.92).abs() < 1e-12);
}

#[test_log::test(tokio::test)]
async fn test_invalid_configuration_is_fatal() {
    let mock_server = test_utils::create_rates_server(test_utils::rates_body(0.9), 0).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "  cache_validity_secs: 0");

    let result = render(
        AppCommand::Quote {
            request: CostRequest::new(1000, 1.0),
            exchange_rate: None,
            json: false,
        },
        config_file.path().to_str().unwrap(),
    )
    .await;

    let err = result.expect_err("Zero cache validity must be rejected");
    assert!(format!("{err:#}").contains("cache_validity_secs"));
}

#[test_log::test(tokio::test)]
async fn test_unparsable_config_file() {
    let config_file = tempfile::NamedTempFile::new().unwrap();
    fs::write(config_file.path(), "pricing: [not, a, map]").unwrap();

    let result = render(AppCommand::Rate, config_file.path().to_str().unwrap()).await;
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file")
    );
}

#[test_log::test(tokio::test)]
async fn test_credits_conversion_command() {
    let mock_server = test_utils::create_rates_server(test_utils::rates_body(0.9), 0).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");
    let config_path = config_file.path().to_str().unwrap();

    let to_eur = render(
        AppCommand::Credits {
            amount: 2_500_000.0,
            from_eur: false,
        },
        config_path,
    )
    .await
    .unwrap();
    assert_eq!(to_eur, "2500000 credits = EUR 2.5");

    let to_credits = render(
        AppCommand::Credits {
            amount: 2.5,
            from_eur: true,
        },
        config_path,
    )
    .await
    .unwrap();
    assert_eq!(to_credits, "EUR 2.5 = 2500000 credits");
}

#[test_log::test(tokio::test)]
async fn test_quote_applies_env_overrides_over_file() {
    let mock_server = test_utils::create_rates_server(test_utils::rates_body(0.5), 0).await;
    let config_file = test_utils::write_config(&mock_server.uri(), "");

    let output = render_command_with_env(
        AppCommand::Quote {
            request: CostRequest::new(1_000_000, 10.0),
            exchange_rate: Some(0.92),
            json: true,
        },
        Some(config_file.path().to_str().unwrap()),
        |name| (name == "PROVIDER_MARKUP").then(|| "0.5".to_string()),
    )
    .await
    .unwrap();

    let record: TransactionRecord = serde_json::from_str(&output).unwrap();
    assert_eq!(record.provider_markup, 0.5);
    assert_eq!(record.rebalancing_fee, 0.025);
    let expected = 10.0 * 1.5 * 1.025 * 0.92;
    assert!((record.cost_eur - expected).abs() < 1e-9);
}
