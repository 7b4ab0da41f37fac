//! TTL-bounded caching for armory lookups.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache seam used by the client and the snapshot builder. Implementations
/// must be shareable across tasks. `get` hands back an owned clone, so a
/// caller can never mutate a stored entry in place.
pub trait Cache<V: Clone>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn put(&self, key: &str, value: V);
}

struct Cached<V> {
    value: V,
    stored_at: Instant,
}

impl<V> Cached<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// In-memory store with one TTL per instance. Expiry is lazy: a stale entry
/// is dropped on the access that finds it stale.
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, Cached<V>>>,
    ttl: Duration,
}

impl<V: Clone> MemoryCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Live entry count; stale entries still pending lazy removal are counted.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        // A poisoned lock degrades to a miss rather than taking the caller down.
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(cached) if cached.is_fresh(self.ttl) => Some(cached.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                Cached {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
