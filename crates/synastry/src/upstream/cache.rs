use moka::sync::Cache;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Raw upstream payloads keyed by endpoint path and exact request body.
///
/// Entries live for `ttl`, and at most `capacity` are held. A zero TTL or
/// zero capacity disables caching.
pub struct ResponseCache {
    entries: Option<Cache<String, Value>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let entries = (!ttl.is_zero() && capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { entries }
    }

    pub fn key(path: &str, body: &str) -> String {
        format!("{path}\n{body}")
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.as_ref()?.get(key)
    }

    pub fn insert(&self, key: String, payload: Value) {
        if let Some(entries) = &self.entries {
            entries.insert(key, payload);
        }
    }

    /// Live entry count, after pending evictions are applied.
    pub fn len(&self) -> u64 {
        match &self.entries {
            Some(entries) => {
                entries.run_pending_tasks();
                entries.entry_count()
            }
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.entries.is_some())
            .field("len", &self.len())
            .finish()
    }
}
