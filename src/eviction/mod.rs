//! Eviction policy abstraction.
//!
//! A policy tracks recency (or whatever ordering it implements) for the keys
//! a shard has told it about, and hands back victims on demand. It never
//! touches the shard's map or byte accounting directly — the shard calls
//! [`EvictionPolicy::evict`] and removes the returned keys itself.

pub mod lru;

pub use lru::Lru;

/// Capability set a shard drives its eviction policy through.
///
/// A policy instance is exclusively owned by one shard and is expected to
/// hold its own lock internally if it needs one; the shard calls these
/// methods while already holding the shard lock, so a policy never needs to
/// coordinate with concurrent callers of its own.
pub trait EvictionPolicy: Send + Sync {
    /// Record that `key` was written. If already tracked, move it to the
    /// most-recent position; otherwise insert it there.
    fn on_set(&mut self, key: &str);

    /// Record that `key` was read. No-op if `key` is not tracked.
    fn on_get(&mut self, key: &str);

    /// Record that `key` was removed. No-op if `key` is not tracked.
    fn on_delete(&mut self, key: &str);

    /// Remove and return up to `n` least-recent keys, least-recent first.
    /// Returns fewer than `n` (possibly zero) if the policy tracks fewer
    /// keys than requested.
    fn evict(&mut self, n: usize) -> Vec<String>;

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Factory for eviction policy instances, one per shard.
pub type EvictorFactory = std::sync::Arc<dyn Fn() -> Box<dyn EvictionPolicy> + Send + Sync>;

/// An [`EvictorFactory`] that builds a fresh [`Lru`] per shard.
pub fn lru_factory() -> EvictorFactory {
    std::sync::Arc::new(|| Box::new(Lru::new()) as Box<dyn EvictionPolicy>)
}
