mod common;

use common::{client_against, APP_LIST_PATH};
use jdy_client::{ClientError, RequestRecord};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Auth and host rewrite ───────────────────────────────────────

#[tokio::test]
async fn bearer_token_and_endpoint_path_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apps": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (_client, tenant) = client_against(&server);
    let apps = tenant.list_apps(100, 0).await.unwrap();
    assert!(apps.is_empty());
}

// ── Retry classification ────────────────────────────────────────

#[tokio::test]
async fn rate_limit_codes_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"code": 8303, "msg": "limit"})),
        )
        .up_to_n_times(5)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apps": []})))
        .mount(&server)
        .await;

    let (_client, tenant) = client_against(&server);
    tenant.list_apps(100, 0).await.unwrap();

    // 5 rate-limited attempts plus the success: more retries than the
    // generic budget would ever allow.
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn second_rate_limit_code_is_also_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"code": 8304})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apps": []})))
        .mount(&server)
        .await;

    let (_client, tenant) = client_against(&server);
    tenant.list_apps(100, 0).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn other_errors_get_three_retries_then_propagate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"code": 4000, "msg": "bad app"})),
        )
        .mount(&server)
        .await;

    let (_client, tenant) = client_against(&server);
    let error = tenant.list_apps(100, 0).await.unwrap_err();
    assert!(matches!(error, ClientError::Request { status: 400, .. }));

    // Initial attempt plus three retries.
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn blank_success_body_is_a_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let (_client, tenant) = client_against(&server);
    let error = tenant.list_apps(100, 0).await.unwrap_err();
    assert!(matches!(error, ClientError::Request { status: 200, .. }));
}

// ── Telemetry ───────────────────────────────────────────────────

#[tokio::test]
async fn observer_sees_every_attempt_without_affecting_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"code": 8303})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apps": []})))
        .mount(&server)
        .await;

    let records: Arc<Mutex<Vec<RequestRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    let client = jdy_client::JdyClient::builder()
        .options(common::fast_options())
        .observer(Arc::new(move |record: &RequestRecord| {
            sink.lock().unwrap().push(record.clone());
        }))
        .build();
    client.register_tenant(
        jdy_client::TenantConfig::new("acme", "test-key").with_server_url(server.uri()),
    );
    let tenant = client.tenant("acme").unwrap();

    tenant.list_apps(100, 0).await.unwrap();

    // Records arrive asynchronously; poll briefly.
    let mut seen = Vec::new();
    for _ in 0..100 {
        seen = records.lock().unwrap().clone();
        if seen.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(seen.len(), 2, "one record per attempt");
    assert_eq!(seen[0].status, Some(400));
    assert_eq!(seen[1].status, Some(200));
    assert_eq!(seen[0].method, "POST");
    assert!(seen[0].url.ends_with(APP_LIST_PATH));
    assert!(seen[0].request_body.as_deref().unwrap().contains("limit"));
    assert!(seen[1].response_body.as_deref().unwrap().contains("apps"));
}

#[tokio::test]
async fn panicking_observer_does_not_fail_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apps": []})))
        .mount(&server)
        .await;

    let client = jdy_client::JdyClient::builder()
        .options(common::fast_options())
        .observer(Arc::new(|_: &RequestRecord| panic!("broken observer")))
        .build();
    client.register_tenant(
        jdy_client::TenantConfig::new("acme", "test-key").with_server_url(server.uri()),
    );
    let tenant = client.tenant("acme").unwrap();

    assert!(tenant.list_apps(100, 0).await.is_ok());
    assert!(tenant.list_apps(100, 0).await.is_ok());
}
