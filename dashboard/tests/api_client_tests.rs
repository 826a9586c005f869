use std::collections::HashSet;
use std::time::Duration;

use dashboard::api::{ApiClient, ApiError, MockDataRequest, ScenarioRequest};
use dashboard::auth::AuthToken;
use serde_json::json;

mod mock_api;
use mock_api::MockApi;

fn client(api: &MockApi, token: Option<&str>) -> ApiClient {
    ApiClient::new(
        api.base_url.clone(),
        token.and_then(AuthToken::new),
        Duration::from_secs(10),
    )
    .unwrap()
}

#[tokio::test]
async fn every_request_carries_bearer_and_a_fresh_request_id() {
    let api = MockApi::start().await;
    let c = client(&api, Some("opaque-token"));

    c.system_stats().await.unwrap();
    c.analytics_summary().await.unwrap();
    c.performance_metrics().await.unwrap();

    let seen = api.seen();
    assert_eq!(seen.len(), 3);
    assert!(
        seen.iter()
            .all(|s| s.authorization.as_deref() == Some("Bearer opaque-token"))
    );

    let ids: HashSet<_> = seen.iter().filter_map(|s| s.request_id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn no_token_means_no_authorization_header() {
    let api = MockApi::start().await;
    client(&api, None).scenarios().await.unwrap();
    assert!(api.seen()[0].authorization.is_none());
}

#[tokio::test]
async fn reads_raw_and_enveloped_endpoints() {
    let api = MockApi::start().await;
    let c = client(&api, None);

    let stats = c.system_stats().await.unwrap();
    assert_eq!(stats.total_suppliers, Some(160.0));
    assert_eq!(stats.high_risk_suppliers, None);

    let catalog = c.scenarios().await.unwrap();
    assert_eq!(catalog.total_count, 2);
    assert_eq!(catalog.scenarios["SUEZ_CANAL_CRISIS"].name, "Suez Canal Blockage");
    assert!(catalog.scenarios["CYBER_ATTACK"].complexity.is_none());

    let planning = c.planning_analytics().await.unwrap();
    assert_eq!(planning.demand_accuracy.current_month, 93.4);
    assert_eq!(planning.inventory_metrics.service_level, 97.3);

    let risk = c.real_time_risk(17).await.unwrap();
    assert_eq!(risk["supplierId"], json!(17));
    assert_eq!(api.hits("/api/analytics/real-time-risk/17"), 1);
}

#[tokio::test]
async fn scenario_request_uses_dashboard_defaults() {
    let api = MockApi::start().await;
    let c = client(&api, None);

    let run = c
        .generate_scenario(&ScenarioRequest::new("SUEZ_CANAL_CRISIS"))
        .await
        .unwrap();

    assert_eq!(run.scenario_type, "SUEZ_CANAL_CRISIS");
    assert_eq!(run.scenario["id"], json!("sim-0"));
    assert_eq!(run.message.as_deref(), Some("Testing scenario generated successfully"));

    let body = api.seen()[0].body.clone().unwrap();
    assert_eq!(body["intensity"], json!(3));
    assert_eq!(body["affectedRegions"], json!(["Asia", "Europe"]));
}

#[tokio::test]
async fn success_false_is_an_error() {
    let api = MockApi::start().await;
    let err = client(&api, None)
        .generate_scenario(&ScenarioRequest::new("BROKEN"))
        .await
        .unwrap_err();

    match err {
        ApiError::Unsuccessful { endpoint, message } => {
            assert_eq!(endpoint, "/api/admin/testing/generate-scenario");
            assert!(message.contains("unknown type"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_carry_status_and_message() {
    let api = MockApi::start().await;
    api.set_healthy(false);

    let err = client(&api, None).system_stats().await.unwrap_err();
    match err {
        ApiError::Status {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("/api/admin/data-stats is down"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn mock_data_request_shape() {
    let api = MockApi::start().await;
    let data = client(&api, None)
        .generate_mock_data(&MockDataRequest::new("suppliers", json!({"count": 25})))
        .await
        .unwrap();

    assert_eq!(data, json!({"dataType": "suppliers", "generated": 25}));
    assert_eq!(
        api.seen()[0].body,
        Some(json!({"dataType": "suppliers", "config": {"count": 25}}))
    );
}

#[tokio::test]
async fn unreachable_backend_is_an_http_error() {
    let c = ApiClient::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
    assert!(matches!(c.system_stats().await, Err(ApiError::Http(_))));
}
