//! Resilient request execution.
//!
//! One place attaches auth, resolves the tenant's server, classifies
//! failures and drives the retry policies. The platform signals errors
//! with a non-2xx status plus a JSON body carrying a numeric `code`; two
//! of those codes mean "over the rate budget" and are worth waiting out,
//! everything else gets bounded retries.

use crate::config::{RetryPolicy, TenantConfig};
use crate::endpoint::Endpoint;
use crate::engine::{EngineRequest, HttpEngine, HttpMethod};
use crate::error::{ClientError, ClientResult};
use crate::telemetry::{RequestObserver, RequestRecord, TelemetrySink};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use url::Url;

/// Error codes the platform uses for request-frequency limiting.
const RATE_LIMIT_CODES: [i64; 2] = [8303, 8304];

pub(crate) struct RequestExecutor {
    engine: Arc<dyn HttpEngine>,
    retry: Vec<RetryPolicy>,
    telemetry: Option<TelemetrySink>,
    body_limit: usize,
}

impl RequestExecutor {
    pub(crate) fn new(
        engine: Arc<dyn HttpEngine>,
        retry: Vec<RetryPolicy>,
        observer: Option<Arc<dyn RequestObserver>>,
        body_limit: usize,
    ) -> Self {
        Self {
            engine,
            retry,
            telemetry: observer.map(TelemetrySink::new),
            body_limit,
        }
    }

    /// JSON-POSTs an endpoint on behalf of a tenant and parses the
    /// response body as a JSON tree.
    pub(crate) async fn call<B>(
        &self,
        tenant: &TenantConfig,
        endpoint: Endpoint,
        body: &B,
    ) -> ClientResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let url = endpoint.url(&tenant.server_url)?;
        let headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", tenant.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        let payload = serde_json::to_vec(body)?;
        let text = self
            .send_with_retry(HttpMethod::Post, url, headers, Some(payload))
            .await?;
        serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("response is not JSON: {e}")))
    }

    /// Sends to an absolute URL with retry and telemetry but without auth
    /// or host rewriting; used for the upload URLs the platform issues.
    pub(crate) async fn send_raw(
        &self,
        method: HttpMethod,
        url: Url,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> ClientResult<String> {
        self.send_with_retry(method, url, headers, body).await
    }

    async fn send_with_retry(
        &self,
        method: HttpMethod,
        url: Url,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> ClientResult<String> {
        let mut retries = vec![0u32; self.retry.len()];
        loop {
            match self.attempt(method, url.clone(), &headers, body.clone()).await {
                Ok(text) => return Ok(text),
                Err(error) => {
                    let Some(index) = self.retry.iter().position(|p| p.matches(&error)) else {
                        return Err(error);
                    };
                    let policy = &self.retry[index];
                    if let Some(max) = policy.max_retries {
                        if retries[index] >= max {
                            return Err(error);
                        }
                    }
                    retries[index] += 1;
                    warn!(
                        %url,
                        %error,
                        retry = retries[index],
                        "request failed; backing off before retry"
                    );
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    /// One attempt: dispatch, classify, and record telemetry either way.
    async fn attempt(
        &self,
        method: HttpMethod,
        url: Url,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> ClientResult<String> {
        let started_at = Utc::now();
        let started = Instant::now();
        let request_body = body
            .as_ref()
            .map(|b| truncate_utf8(String::from_utf8_lossy(b).into_owned(), self.body_limit));

        let request = EngineRequest {
            method,
            url: url.clone(),
            headers: headers.to_vec(),
            body,
        };

        let mut status = None;
        let mut response_body = None;
        let outcome = match self.engine.send(request).await {
            Ok(response) => {
                let text = response.body_text();
                status = Some(response.status);
                response_body = Some(text.clone());
                classify(response.status, text)
            }
            Err(e) => Err(ClientError::Transport(e.to_string())),
        };
        let duration = started.elapsed();

        if let Some(sink) = &self.telemetry {
            sink.emit(RequestRecord {
                method: method.as_str().to_string(),
                url: url.to_string(),
                request_body,
                response_body,
                status,
                started_at,
                duration,
            });
        }

        outcome
    }
}

/// Sorts a response into success, rate limiting, or generic failure.
fn classify(status: u16, body: String) -> ClientResult<String> {
    if is_rate_limit_body(&body) {
        return Err(ClientError::RateLimited { status, body });
    }
    if !(200..300).contains(&status) || body.trim().is_empty() {
        return Err(ClientError::Request { status, body });
    }
    Ok(body)
}

/// Whether a response body carries one of the rate-limit error codes.
fn is_rate_limit_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|tree| tree.get("code")?.as_i64())
        .is_some_and(|code| RATE_LIMIT_CODES.contains(&code))
}

/// Truncates on a char boundary at or below `limit` bytes.
fn truncate_utf8(mut s: String, limit: usize) -> String {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}
