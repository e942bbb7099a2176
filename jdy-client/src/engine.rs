//! Pluggable HTTP transport.
//!
//! The client core never talks to the network directly; it hands an
//! [`EngineRequest`] to an [`HttpEngine`] and classifies the returned
//! [`EngineResponse`]. The shipped engine wraps `reqwest`; tests or
//! embedders can substitute their own transport.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport-level failure: the request never produced an HTTP response.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request as plain data.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// An HTTP response as plain data.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl EngineResponse {
    /// The body decoded as text (lossily; the platform speaks UTF-8 JSON).
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transport seam: one round-trip, no retries, no auth.
///
/// Implementations own connection pooling and the I/O timeout.
#[async_trait]
pub trait HttpEngine: Send + Sync {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse, EngineError>;
}

/// Default engine backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    /// Builds an engine whose every call times out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }
}

#[async_trait]
impl HttpEngine for ReqwestEngine {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| EngineError(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| EngineError(e.to_string()))?
            .to_vec();

        Ok(EngineResponse {
            status,
            headers,
            body,
        })
    }
}
