//! TTL-keyed map with lazy eviction on read

use crate::types::CacheEntry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// A string-keyed cache whose entries expire individually.
///
/// Reads proceed concurrently; writes and lazy deletions take the write half
/// of a single coarse lock over the whole map. There is no capacity bound and
/// no background sweeper: an expired entry stays in the map until the next
/// `get` of its key removes it.
pub struct ExpiringCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a key.
    ///
    /// An entry whose TTL has elapsed is reported absent and dropped from the
    /// map before returning; a live value is returned by clone.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // The entry outlived its TTL. Re-check under the write lock: a
        // concurrent set may have replaced it with a live value.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
            debug!(key = %key, "removing expired cache entry");
            entries.remove(key);
        }
        None
    }

    /// Insert or replace the entry for `key`, alive for `ttl` from now.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            expires_at: Instant::now() + ttl,
            value,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Number of entries physically present, including not-yet-collected
    /// expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
