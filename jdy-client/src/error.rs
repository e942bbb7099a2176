//! Error types for the client.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by client operations.
///
/// Retry classification: [`ClientError::RateLimited`] is expected-transient
/// and retried unboundedly by the default policy; [`ClientError::Request`]
/// and [`ClientError::Transport`] get bounded retries. Everything else is
/// raised before or after the request itself and is never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The platform reported one of its rate-limit error codes.
    #[error("rate limited by the platform (status {status}): {body}")]
    RateLimited { status: u16, body: String },

    /// Non-2xx status or blank response body.
    #[error("request failed (status {status}): {body}")]
    Request { status: u16, body: String },

    /// The HTTP engine failed before a response arrived (I/O, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// No configuration registered for the requested tenant.
    #[error("no configuration registered for tenant {0:?}")]
    UnknownTenant(String),

    /// A tenant's server URL (or similar configuration) is unusable.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// A filter condition cannot be encoded for the wire.
    #[error("invalid filter: {0}")]
    Filter(String),

    /// Caller-supplied request data has the wrong shape.
    #[error("invalid request data: {0}")]
    Data(String),

    /// A response did not have the documented shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local file I/O failure during upload.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether this error is the platform's rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }
}
