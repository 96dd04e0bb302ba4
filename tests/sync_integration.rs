use std::fs;

use navsync::core::config::AppConfig;
use navsync::core::task::TaskStatus;
use navsync::sync::guard::TriggerOutcome;
use rust_decimal::Decimal;
use std::str::FromStr;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_quote_mock_server(symbol: &str, price: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let body = format!(
            r#"{{"Global Quote": {{"01. symbol": "{symbol}", "05. price": "{price}"}}}}"#
        );

        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_fund_page_mock_server(
        code: &str,
        name: &str,
        nav_label: &str,
    ) -> MockServer {
        let mock_server = MockServer::start().await;
        let page_path = format!("/fundCenter/fundOverview/fundContent/{code}");
        let body = format!(
            r#"<html><body>
                <h1>{name}</h1>
                <h3 class="text-4xl basis-10 shrink-0 mt-2 mb-3">{nav_label}</h3>
            </body></html>"#
        );

        Mock::given(method("GET"))
            .and(path(&page_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn config_for(quote_url: &str, page_url: &str) -> String {
    format!(
        r#"
assets:
  - code: "VT"
    name: "Total World ETF"
  - code: "004205"
providers:
  quote_api:
    base_url: "{quote_url}"
    api_key: "test-key"
  fund_page:
    base_url: "{page_url}"
sync:
  quote_pace_ms: 10
  page_pace_ms: 10
"#
    )
}

#[test_log::test(tokio::test)]
async fn test_full_sync_flow_with_mixed_sources() {
    let quote_server = test_utils::create_quote_mock_server("VT", "118.24").await;
    let fund_server =
        test_utils::create_fund_page_mock_server("004205", "全球基金", "NT$15.82").await;

    let config: AppConfig =
        serde_yaml::from_str(&config_for(&quote_server.uri(), &fund_server.uri())).unwrap();
    let (store, service) = navsync::build_service(&config);

    let outcome = service.trigger_now().await;

    let TriggerOutcome::Completed(record) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(record.status, TaskStatus::Success);
    assert_eq!(record.items_processed, 2);
    assert_eq!(record.retries_attempted, 0);

    let rows = store.snapshot().await;
    assert_eq!(rows[0].nav, Some(Decimal::from_str("118.24").unwrap()));
    assert_eq!(rows[1].nav, Some(Decimal::from_str("15.82").unwrap()));
    assert!(rows[0].last_synced.is_some());
    assert!(rows[1].last_synced.is_some());

    // The snapshot survives as the last run result
    let last = service.last_run().unwrap();
    assert_eq!(last.items_processed, 2);
    assert!(!service.is_running());
}

#[test_log::test(tokio::test)]
async fn test_partial_failure_keeps_successes() {
    // Only the ticker resolves; the fund page serves no NAV element
    let quote_server = test_utils::create_quote_mock_server("VT", "118.24").await;
    let fund_server =
        test_utils::create_fund_page_mock_server("004205", "全球基金", "暫無淨值").await;

    let config: AppConfig =
        serde_yaml::from_str(&config_for(&quote_server.uri(), &fund_server.uri())).unwrap();
    let (store, service) = navsync::build_service(&config);

    let TriggerOutcome::Completed(record) = service.trigger_now().await else {
        panic!("expected a completed run");
    };

    // Partial failure shows up as a count discrepancy, not an error
    assert_eq!(record.status, TaskStatus::Success);
    assert_eq!(record.items_processed, 1);

    let rows = store.snapshot().await;
    assert!(rows[0].nav.is_some());
    assert!(rows[1].nav.is_none());
}

#[test_log::test(tokio::test)]
async fn test_run_command_sync_with_config_file() {
    let quote_server = test_utils::create_quote_mock_server("VT", "118.24").await;
    let fund_server =
        test_utils::create_fund_page_mock_server("004205", "全球基金", "NT$15.82").await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        config_for(&quote_server.uri(), &fund_server.uri()),
    )
    .expect("Failed to write config file");

    let result = navsync::run_command(
        navsync::AppCommand::Sync,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    assert!(result.is_ok(), "Sync command failed: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_sync_with_no_assets_contacts_no_source() {
    let config: AppConfig = serde_yaml::from_str(
        r#"
assets: []
providers:
  quote_api:
    base_url: "http://127.0.0.1:1"
    api_key: "test-key"
  fund_page:
    base_url: "http://127.0.0.1:1"
"#,
    )
    .unwrap();
    let (_store, service) = navsync::build_service(&config);

    let TriggerOutcome::Completed(record) = service.trigger_now().await else {
        panic!("expected a completed run");
    };
    assert_eq!(record.status, TaskStatus::Success);
    assert_eq!(record.items_processed, 0);
}
