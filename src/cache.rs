//! The public cache facade: builder-style construction plus `get`/`set`.

use crate::error::CacheError;
use crate::eviction::{lru_factory, EvictorFactory};
use crate::metrics::Meter;
use crate::shard::ShardManager;
use bytes::Bytes;
use std::time::Duration;

/// Validated, immutable construction options for a [`Cache`].
pub struct CacheOptions<'a> {
    ttl: Duration,
    max_size: u64,
    max_keys: usize,
    shard_count: usize,
    evictor_factory: EvictorFactory,
    meter: &'a dyn Meter,
}

impl<'a> CacheOptions<'a> {
    /// Start from the documented defaults (30 min TTL, 1 GiB, 2,000,000
    /// keys, 256 shards, LRU eviction) for the given meter.
    pub fn new(meter: &'a dyn Meter) -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_size: 1024 * 1024 * 1024,
            max_keys: 2_000_000,
            shard_count: 256,
            evictor_factory: lru_factory(),
            meter,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn evictor_factory(mut self, factory: EvictorFactory) -> Self {
        self.evictor_factory = factory;
        self
    }
}

/// A sharded, size- and count-bounded key/value cache with TTL expiry.
///
/// Immutable after construction: the shard manager and its ring never
/// change shape for the life of the process.
pub struct Cache {
    manager: ShardManager,
}

/// Build and validate a [`Cache`] from the given options.
pub fn new_cache(options: CacheOptions<'_>) -> Result<Cache, CacheError> {
    if options.ttl.is_zero() {
        return Err(CacheError::InvalidConfig("ttl must be positive".into()));
    }
    if options.max_size == 0 {
        return Err(CacheError::InvalidConfig(
            "max_size must be positive".into(),
        ));
    }
    if options.max_keys == 0 {
        return Err(CacheError::InvalidConfig(
            "max_keys must be positive".into(),
        ));
    }
    if options.shard_count == 0 {
        return Err(CacheError::InvalidConfig(
            "shard_count must be positive".into(),
        ));
    }

    let byte_budget = (options.max_size / options.shard_count as u64) as usize;
    let count_budget = options.max_keys / options.shard_count;

    if byte_budget == 0 {
        return Err(CacheError::InvalidConfig(
            "max_size / shard_count leaves a zero byte budget per shard".into(),
        ));
    }
    if count_budget == 0 {
        return Err(CacheError::InvalidConfig(
            "max_keys / shard_count leaves a zero key budget per shard".into(),
        ));
    }

    let manager = ShardManager::new(
        options.shard_count,
        byte_budget,
        count_budget,
        options.ttl,
        &options.evictor_factory,
        options.meter,
    )?;

    Ok(Cache { manager })
}

impl Cache {
    /// Look up `key`, routing through the shard manager's hash ring.
    pub fn get(&self, key: &str) -> Result<Bytes, CacheError> {
        self.manager.get_shard(key).get(key)
    }

    /// Admit `value` under `key`, routing through the shard manager's ring.
    pub fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<(), CacheError> {
        self.manager.get_shard(key).set(key, value)
    }

    pub fn shard_count(&self) -> usize {
        self.manager.shard_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::recording::RecordingMeter;

    #[test]
    fn basic_set_then_get() {
        let meter = RecordingMeter::new();
        let cache = new_cache(CacheOptions::new(&meter)).unwrap();
        cache.set("a", b"b".to_vec()).unwrap();
        assert_eq!(cache.get("a").unwrap(), b"b".to_vec());
    }

    #[test]
    fn expiry_after_ttl_elapses() {
        let meter = RecordingMeter::new();
        let cache =
            new_cache(CacheOptions::new(&meter).ttl(Duration::from_millis(10))).unwrap();
        cache.set("a", b"b".to_vec()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("a").unwrap_err(), CacheError::Expired);
    }

    #[test]
    fn miss_on_absent_key() {
        let meter = RecordingMeter::new();
        let cache = new_cache(CacheOptions::new(&meter)).unwrap();
        assert_eq!(cache.get("missing").unwrap_err(), CacheError::NotFound);
    }

    #[test]
    fn invalid_value_on_single_shard() {
        let meter = RecordingMeter::new();
        let cache = new_cache(CacheOptions::new(&meter).shard_count(1)).unwrap();
        assert_eq!(
            cache.set("k", Vec::new()).unwrap_err(),
            CacheError::InvalidValue
        );
    }

    #[test]
    fn value_too_large_with_small_budget() {
        let meter = RecordingMeter::new();
        let cache = new_cache(
            CacheOptions::new(&meter)
                .shard_count(2)
                .max_size(2)
                .max_keys(10),
        )
        .unwrap();
        assert_eq!(
            cache.set("k", b"too".to_vec()).unwrap_err(),
            CacheError::ValueTooLarge
        );
    }

    #[test]
    fn zero_ttl_is_rejected_at_construction() {
        let meter = RecordingMeter::new();
        let result = new_cache(CacheOptions::new(&meter).ttl(Duration::ZERO));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn zero_byte_budget_per_shard_is_rejected() {
        let meter = RecordingMeter::new();
        let result = new_cache(CacheOptions::new(&meter).max_size(10).shard_count(512));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn zero_count_budget_per_shard_is_rejected() {
        let meter = RecordingMeter::new();
        let result = new_cache(CacheOptions::new(&meter).max_keys(10).shard_count(512));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn routing_is_stable_across_calls() {
        let meter = RecordingMeter::new();
        let cache = new_cache(CacheOptions::new(&meter).shard_count(8)).unwrap();
        let a = cache.manager.get_shard("a").id().to_string();
        let b = cache.manager.get_shard("a").id().to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn concurrent_get_and_set_soak() {
        use std::sync::Arc;
        use std::thread;

        let meter = RecordingMeter::new();
        let cache = Arc::new(new_cache(CacheOptions::new(&meter).shard_count(16)).unwrap());

        let mut handles = Vec::new();
        for worker in 0..16 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                for i in 0..2000 {
                    let key = format!("key-{}", (worker * 37 + i) % 100);
                    if i % 5 == 0 {
                        let _ = cache.set(&key, b"value".to_vec());
                    } else {
                        let _ = cache.get(&key);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
