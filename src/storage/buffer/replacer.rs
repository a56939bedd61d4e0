use std::fmt::Debug;

/// Victim selection for the page cache, keyed by page identity.
pub trait Replacer<K>: Send + Sync + Debug {
    /// Record that `key` was just used. Unknown keys become tracked.
    fn record_access(&mut self, key: K);

    /// Stop tracking `key`.
    fn remove(&mut self, key: &K);

    /// Select and stop tracking a victim for which `evictable` holds.
    /// Returns None if no tracked key qualifies.
    fn evict(&mut self, evictable: &dyn Fn(&K) -> bool) -> Option<K>;

    /// Get the number of tracked keys.
    fn size(&self) -> usize;
}
