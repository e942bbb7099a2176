//! Shared test helpers: a client wired to a mock server, and a fake
//! form backend that honors the cursor protocol.

#![allow(dead_code)]

use jdy_client::{ClientOptions, ErrorClass, JdyClient, RetryPolicy, Tenant, TenantConfig};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const LIST_PATH: &str = "/api/v5/app/entry/data/list";
pub const WIDGET_PATH: &str = "/api/v5/app/entry/widget/list";
pub const CREATE_PATH: &str = "/api/v5/app/entry/data/create";
pub const BATCH_CREATE_PATH: &str = "/api/v5/app/entry/data/batch_create";
pub const UPDATE_PATH: &str = "/api/v5/app/entry/data/update";
pub const BATCH_UPDATE_PATH: &str = "/api/v5/app/entry/data/batch_update";
pub const DELETE_PATH: &str = "/api/v5/app/entry/data/delete";
pub const BATCH_DELETE_PATH: &str = "/api/v5/app/entry/data/batch_delete";
pub const APP_LIST_PATH: &str = "/api/v5/app/list";
pub const TOKEN_PATH: &str = "/api/v5/app/entry/file/get_upload_token";

/// Retry policies with millisecond backoff so failure tests stay fast.
pub fn fast_options() -> ClientOptions {
    ClientOptions {
        retry: vec![
            RetryPolicy {
                applies_to: ErrorClass::RateLimit,
                max_retries: None,
                backoff: Duration::from_millis(1),
            },
            RetryPolicy {
                applies_to: ErrorClass::Any,
                max_retries: Some(3),
                backoff: Duration::from_millis(1),
            },
        ],
        ..ClientOptions::default()
    }
}

/// Opt-in request tracing while debugging: `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A client with one tenant (`acme`, key `test-key`) pointed at the server.
pub fn client_against(server: &MockServer) -> (JdyClient, Tenant) {
    init_tracing();
    let client = JdyClient::builder().options(fast_options()).build();
    client.register_tenant(TenantConfig::new("acme", "test-key").with_server_url(server.uri()));
    let tenant = client.tenant("acme").expect("tenant just registered");
    (client, tenant)
}

/// A widget-list response declaring the given `(name, type)` fields.
pub fn schema_response(fields: &[(&str, &str)]) -> Value {
    let widgets: Vec<Value> = fields
        .iter()
        .map(|(name, ty)| json!({"name": name, "type": ty}))
        .collect();
    json!({"widgets": widgets, "dataModifyTime": "2024-10-22T20:26:29Z"})
}

/// Fake data backend holding `total` rows with ids `id0000`, `id0001`, ...
/// in ascending order. Honors the request's `limit` and resumes after the
/// `data_id` cursor, exactly like the remote list endpoint.
pub struct FakeRows {
    pub total: usize,
}

impl Respond for FakeRows {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("list body is JSON");
        let limit = body["limit"].as_u64().expect("limit present") as usize;
        let start = body
            .get("data_id")
            .and_then(Value::as_str)
            .map(|id| row_index(id) + 1)
            .unwrap_or(0);
        let end = (start + limit).min(self.total);
        let rows: Vec<Value> = (start..end)
            .map(|i| json!({"_id": row_id(i), "seq": i}))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({"data": rows}))
    }
}

pub fn row_id(index: usize) -> String {
    format!("id{index:04}")
}

pub fn row_index(id: &str) -> usize {
    id.trim_start_matches("id").parse().expect("row id suffix")
}

/// The subset of recorded requests that hit `path`, with parsed bodies.
pub async fn bodies_for(server: &MockServer, path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|r| r.url.path() == path)
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}
