//! Client construction and tenant sessions.
//!
//! A [`JdyClient`] owns the shared machinery (config store, HTTP engine,
//! retry policies, schema cache). Work always happens through a [`Tenant`]
//! session obtained with [`JdyClient::tenant`], which pins the tenant label
//! while re-resolving its configuration from the store on every request.
//! Re-registering a tenant takes effect immediately, and sessions cannot
//! leak one tenant's credentials into another's calls.

use crate::cache::SchemaCache;
use crate::config::{ClientOptions, TenantConfig};
use crate::endpoint::Endpoint;
use crate::engine::{HttpEngine, ReqwestEngine};
use crate::error::{ClientError, ClientResult};
use crate::executor::RequestExecutor;
use crate::store::{ConfigStore, MemoryConfigStore};
use crate::telemetry::RequestObserver;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How long a fetched form schema is trusted before refetching.
const SCHEMA_TTL: Duration = Duration::from_secs(30);

pub(crate) struct Shared {
    pub(crate) store: Arc<dyn ConfigStore>,
    pub(crate) executor: RequestExecutor,
    pub(crate) schemas: SchemaCache,
}

/// Entry point: holds tenant configurations and the shared request stack.
#[derive(Clone)]
pub struct JdyClient {
    shared: Arc<Shared>,
}

impl JdyClient {
    /// A client with default options and an in-memory config store.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> JdyClientBuilder {
        JdyClientBuilder::default()
    }

    /// Registers (or replaces) a tenant configuration.
    pub fn register_tenant(&self, config: TenantConfig) {
        self.shared.store.put(config);
    }

    /// Removes a tenant configuration.
    pub fn remove_tenant(&self, name: &str) {
        self.shared.store.remove(name);
    }

    pub fn has_tenant(&self, name: &str) -> bool {
        self.shared.store.contains(name)
    }

    /// Opens a session for a registered tenant.
    pub fn tenant(&self, name: &str) -> ClientResult<Tenant> {
        if !self.shared.store.contains(name) {
            return Err(ClientError::UnknownTenant(name.to_string()));
        }
        Ok(Tenant {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }
}

impl Default for JdyClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`JdyClient`].
#[derive(Default)]
pub struct JdyClientBuilder {
    options: ClientOptions,
    engine: Option<Arc<dyn HttpEngine>>,
    store: Option<Arc<dyn ConfigStore>>,
    observer: Option<Arc<dyn RequestObserver>>,
}

impl JdyClientBuilder {
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Substitutes the HTTP transport. The default is [`ReqwestEngine`]
    /// with the configured timeout.
    pub fn engine(mut self, engine: Arc<dyn HttpEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Substitutes the tenant-configuration store.
    pub fn store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attaches a request-telemetry observer.
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> JdyClient {
        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(ReqwestEngine::new(self.options.timeout)));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryConfigStore::new()));
        let executor = RequestExecutor::new(
            engine,
            self.options.retry,
            self.observer,
            self.options.telemetry_body_limit,
        );
        JdyClient {
            shared: Arc::new(Shared {
                store,
                executor,
                schemas: SchemaCache::new(SCHEMA_TTL),
            }),
        }
    }
}

/// A session scoped to one tenant.
///
/// Cheap to clone; safe to drop at any time. All API operations live on
/// this type (see the app, data and file modules).
#[derive(Clone)]
pub struct Tenant {
    name: String,
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant").field("name", &self.name).finish()
    }
}

impl Tenant {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves the tenant's current configuration from the store.
    pub(crate) fn config(&self) -> ClientResult<TenantConfig> {
        self.shared
            .store
            .get(&self.name)
            .ok_or_else(|| ClientError::UnknownTenant(self.name.clone()))
    }

    /// Executes one endpoint call under this tenant's configuration.
    pub(crate) async fn call<B>(&self, endpoint: Endpoint, body: &B) -> ClientResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let config = self.config()?;
        self.shared.executor.call(&config, endpoint, body).await
    }
}

/// Pulls a typed value out of a response tree by key.
pub(crate) fn decode_field<T: DeserializeOwned>(tree: &Value, key: &str) -> ClientResult<T> {
    let value = tree
        .get(key)
        .cloned()
        .ok_or_else(|| ClientError::Decode(format!("response is missing {key:?}")))?;
    serde_json::from_value(value)
        .map_err(|e| ClientError::Decode(format!("response field {key:?}: {e}")))
}
