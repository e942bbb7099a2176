//! Tenant and client configuration.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The platform's public API server.
pub const DEFAULT_SERVER_URL: &str = "https://api.jiandaoyun.com";

/// Per-tenant configuration: one API key, one server.
///
/// `server_url` only contributes scheme and host; request paths always come
/// from the endpoint table, so private deployments just point this at their
/// own gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// The tenant label used to select this configuration.
    pub name: String,
    /// Bearer token attached to every request.
    pub api_key: String,
    pub server_url: String,
}

impl TenantConfig {
    pub fn new(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }

    /// Points the tenant at a private-deployment server.
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }
}

/// Which error kinds a retry policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Only the platform's rate-limit errors.
    RateLimit,
    /// Any request failure, rate limiting included.
    Any,
}

/// One retry rule: how often to retry matching failures, and how long to
/// wait in between.
///
/// Built once per client and consulted on every failure; the first policy
/// whose class matches the error wins.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub applies_to: ErrorClass,
    /// `None` retries without bound.
    pub max_retries: Option<u32>,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Rate limiting is transient and self-resolving, so the default is to
    /// wait it out indefinitely.
    pub fn rate_limit() -> Self {
        Self {
            applies_to: ErrorClass::RateLimit,
            max_retries: None,
            backoff: Duration::from_secs(1),
        }
    }

    /// Bounded retries for everything else.
    pub fn generic(max_retries: u32) -> Self {
        Self {
            applies_to: ErrorClass::Any,
            max_retries: Some(max_retries),
            backoff: Duration::from_secs(1),
        }
    }

    /// The default policy set: unbounded for rate limits, three retries for
    /// other request failures.
    pub fn defaults() -> Vec<RetryPolicy> {
        vec![Self::rate_limit(), Self::generic(3)]
    }

    pub(crate) fn matches(&self, error: &ClientError) -> bool {
        match self.applies_to {
            ErrorClass::RateLimit => error.is_rate_limited(),
            ErrorClass::Any => true,
        }
    }
}

/// Tunables shared by all tenants of one client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Connect/response timeout for every HTTP call.
    pub timeout: Duration,
    /// Retry rules, checked in order on each failure.
    pub retry: Vec<RetryPolicy>,
    /// Request bodies longer than this are truncated in telemetry records.
    pub telemetry_body_limit: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::defaults(),
            telemetry_body_limit: 4096,
        }
    }
}
