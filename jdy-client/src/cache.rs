//! Short-lived cache for form field schemas.
//!
//! Field descriptors are expensive to fetch and change rarely; the write
//! path and filter-type resolution both need them on every operation.
//! Entries are idempotent given the same remote form state, so eviction
//! and recomputation are always safe.

use jdy_types::FieldDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

pub(crate) struct SchemaCache {
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

struct CacheEntry {
    fetched_at: Instant,
    fields: Arc<Vec<FieldDescriptor>>,
}

impl SchemaCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, app_id: &str, entry_id: &str) -> Option<Arc<Vec<FieldDescriptor>>> {
        let entries = self.entries.read().expect("schema cache lock poisoned");
        let entry = entries.get(&(app_id.to_string(), entry_id.to_string()))?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.fields))
    }

    pub(crate) fn put(
        &self,
        app_id: &str,
        entry_id: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Arc<Vec<FieldDescriptor>> {
        let fields = Arc::new(fields);
        self.entries
            .write()
            .expect("schema cache lock poisoned")
            .insert(
                (app_id.to_string(), entry_id.to_string()),
                CacheEntry {
                    fetched_at: Instant::now(),
                    fields: Arc::clone(&fields),
                },
            );
        fields
    }

    /// Forgets one form's schema, forcing the next use to refetch.
    pub(crate) fn invalidate(&self, app_id: &str, entry_id: &str) {
        self.entries
            .write()
            .expect("schema cache lock poisoned")
            .remove(&(app_id.to_string(), entry_id.to_string()));
    }
}
