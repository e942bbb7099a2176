//! Client for the JianDaoYun open API.
//!
//! The client manages any number of tenants (one API key + server each)
//! and exposes the platform's app, form, field, data-row and file-upload
//! endpoints through per-tenant sessions:
//!
//! ```no_run
//! use jdy_client::{JdyClient, ListQuery, TenantConfig};
//! use jdy_types::Filter;
//!
//! # async fn demo() -> jdy_client::ClientResult<()> {
//! let client = JdyClient::new();
//! client.register_tenant(TenantConfig::new("acme", "api-key"));
//!
//! let acme = client.tenant("acme")?;
//! let query = ListQuery::new("app-id", "entry-id")
//!     .filter(Filter::and().not_empty("_widget_1729599225134"))
//!     .limit(500);
//! let rows = acme.list_data(&query).await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```
//!
//! Writes convert caller records against the form's field schema into the
//! platform's per-field envelopes; reads page through the cursor protocol;
//! every request is retried per the configured policies, with rate limits
//! waited out by default. An optional observer receives per-attempt
//! telemetry off the critical path.

mod app;
mod cache;
mod client;
mod config;
mod data;
mod endpoint;
mod engine;
mod error;
mod executor;
mod file;
mod store;
mod telemetry;

pub use app::{AppSummary, EntrySummary, FormSchema};
pub use client::{JdyClient, JdyClientBuilder, Tenant};
pub use config::{ClientOptions, ErrorClass, RetryPolicy, TenantConfig, DEFAULT_SERVER_URL};
pub use data::{
    CallbackError, CreateBatchRequest, CreateRequest, ListQuery, UpdateBatchRequest, UpdateRequest,
};
pub use endpoint::Endpoint;
pub use engine::{EngineError, EngineRequest, EngineResponse, HttpEngine, HttpMethod, ReqwestEngine};
pub use error::{ClientError, ClientResult};
pub use file::{UploadOutcome, UploadToken, UploadedFile};
pub use store::{ConfigStore, MemoryConfigStore};
pub use telemetry::{RequestObserver, RequestRecord};
