//! Tenant configuration storage.
//!
//! A [`ConfigStore`] maps tenant labels to their [`TenantConfig`]. The
//! shipped implementation is an in-process map; deployments that keep
//! tenant credentials elsewhere implement the trait over their own store.

use crate::config::TenantConfig;
use std::collections::HashMap;
use std::sync::RwLock;

/// Concurrent tenant-configuration storage with last-write-wins semantics
/// per tenant label.
pub trait ConfigStore: Send + Sync {
    /// Registers or replaces a tenant's configuration.
    fn put(&self, config: TenantConfig);

    /// Fetches a tenant's configuration.
    fn get(&self, name: &str) -> Option<TenantConfig>;

    /// Removes a tenant's configuration, if present.
    fn remove(&self, name: &str);

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// In-memory [`ConfigStore`] backed by a read-write-locked map.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: RwLock<HashMap<String, TenantConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn put(&self, config: TenantConfig) {
        self.entries
            .write()
            .expect("config store lock poisoned")
            .insert(config.name.clone(), config);
    }

    fn get(&self, name: &str) -> Option<TenantConfig> {
        self.entries
            .read()
            .expect("config store lock poisoned")
            .get(name)
            .cloned()
    }

    fn remove(&self, name: &str) {
        self.entries
            .write()
            .expect("config store lock poisoned")
            .remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let store = MemoryConfigStore::new();
        assert!(store.get("acme").is_none());

        store.put(TenantConfig::new("acme", "key-1"));
        assert_eq!(store.get("acme").unwrap().api_key, "key-1");
        assert!(store.contains("acme"));

        store.remove("acme");
        assert!(!store.contains("acme"));
    }

    #[test]
    fn last_write_wins_per_tenant() {
        let store = MemoryConfigStore::new();
        store.put(TenantConfig::new("acme", "key-1"));
        store.put(TenantConfig::new("acme", "key-2"));
        assert_eq!(store.get("acme").unwrap().api_key, "key-2");
    }
}
