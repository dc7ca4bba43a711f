//! Entry types for the expiring cache

use std::time::Instant;

/// A single cached value and its expiry deadline.
///
/// Entries are owned by the cache; values leave it only by clone.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub expires_at: Instant,
    pub value: V,
}
