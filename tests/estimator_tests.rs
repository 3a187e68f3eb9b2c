use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use serde_json::json;
use survey_flow::config::Config;
use survey_flow::cost::{CostEstimator, CostInput};
use survey_flow::services::CostService;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str) -> Config {
    Config {
        api_base_url: base_url.to_string(),
        request_timeout_secs: 5,
        default_currency: "KES".to_string(),
        cost_debounce_ms: 50,
        phone_region: "KE".to_string(),
        survey_cache_ttl_secs: 300,
    }
}

fn estimate_body() -> serde_json::Value {
    json!({
        "targetRespondents": 120,
        "costPerRespondent": "10.00",
        "estimatedCost": "1200.00",
        "currentWalletBalance": "500.00",
        "isSufficientFunds": false,
        "requiredTopUpAmount": "700.00"
    })
}

#[tokio::test]
async fn rapid_edits_collapse_to_one_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/surveys/cost/calculate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(estimate_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut estimator, mut results) = CostEstimator::new(
        Arc::new(CostService::new(&config)),
        config.cost_debounce(),
    );

    // Burst of edits well inside the quiet period
    for target in [1u32, 12, 120] {
        estimator.schedule(CostInput::TargetRespondents(target));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let outcome = tokio::time::timeout(Duration::from_secs(2), results.recv())
        .await
        .expect("estimate should arrive")
        .expect("channel open");
    let estimate = outcome.unwrap();
    assert_eq!(estimate.target_respondents, 120);

    // Only the settled input ever reached the API
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({ "targetRespondents": 120 }));
}

#[tokio::test]
async fn budget_input_sends_budget_field() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/surveys/cost/calculate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(estimate_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut estimator, mut results) = CostEstimator::new(
        Arc::new(CostService::new(&config)),
        config.cost_debounce(),
    );
    estimator.schedule(CostInput::Budget(BigDecimal::from(1200)));

    tokio::time::timeout(Duration::from_secs(2), results.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    // Exactly one cost-driving field on the wire
    assert!(body.get("budget").is_some());
    assert!(body.get("targetRespondents").is_none());
}

#[tokio::test]
async fn estimate_now_skips_the_debounce_and_cancels_pending() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/surveys/cost/calculate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(estimate_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut estimator, _results) = CostEstimator::new(
        Arc::new(CostService::new(&config)),
        // Long window: the scheduled call could only fire via the debounce
        Duration::from_secs(60),
    );

    estimator.schedule(CostInput::TargetRespondents(10));
    let estimate = estimator
        .estimate_now(CostInput::TargetRespondents(120))
        .await
        .unwrap();
    assert_eq!(estimate.target_respondents, 120);
    assert!(!estimator.has_pending());
}

#[tokio::test]
async fn calculation_errors_reach_the_subscriber() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/surveys/cost/calculate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("pricing down"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut estimator, mut results) = CostEstimator::new(
        Arc::new(CostService::new(&config)),
        config.cost_debounce(),
    );
    estimator.schedule(CostInput::TargetRespondents(10));

    let outcome = tokio::time::timeout(Duration::from_secs(2), results.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_err());
}

#[tokio::test]
async fn cancel_drops_the_pending_calculation() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/surveys/cost/calculate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(estimate_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut estimator, mut results) = CostEstimator::new(
        Arc::new(CostService::new(&config)),
        config.cost_debounce(),
    );
    estimator.schedule(CostInput::TargetRespondents(10));
    estimator.cancel();

    // Give an erroneously surviving task time to fire
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(results.try_recv().is_err());
}
