//! A single cache shard: concurrency-safe storage for one keyspace slice.

use crate::error::CacheError;
use crate::eviction::EvictionPolicy;
use crate::metrics::ShardMetrics;
use crate::shard::entry::Entry;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct ShardState {
    entries: HashMap<String, Entry>,
    current_size: i64,
    evictor: Box<dyn EvictionPolicy>,
}

/// Owns a slice of the keyspace; enforces byte/count budgets and TTL.
pub struct Shard {
    id: String,
    byte_budget: i64,
    count_budget: usize,
    ttl: Duration,
    metrics: ShardMetrics,
    state: Mutex<ShardState>,
}

impl Shard {
    pub fn new(
        id: String,
        byte_budget: usize,
        count_budget: usize,
        ttl: Duration,
        evictor: Box<dyn EvictionPolicy>,
        metrics: ShardMetrics,
    ) -> Self {
        Self {
            id,
            byte_budget: byte_budget as i64,
            count_budget,
            ttl,
            metrics,
            state: Mutex::new(ShardState {
                entries: HashMap::new(),
                current_size: 0,
                evictor,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Admit `value` under `key`, making space via eviction if necessary.
    pub fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<(), CacheError> {
        let value: Bytes = value.into();
        if value.is_empty() {
            return Err(CacheError::InvalidValue);
        }
        let value_len = value.len();
        if value_len as i64 > self.byte_budget {
            self.metrics.error_count.inc();
            return Err(CacheError::ValueTooLarge);
        }

        let mut state = self.state.lock();

        let existing_size = state.entries.get(key).map(|e| e.size as i64);
        if existing_size.is_none() && state.entries.len() + 1 > self.count_budget {
            self.metrics.error_count.inc();
            return Err(CacheError::TooManyKeys);
        }

        let delta = value_len as i64 - existing_size.unwrap_or(0);
        while state.current_size + delta > self.byte_budget {
            let extra = delta.max(0);
            if !self.make_space_locked(&mut state, extra) {
                self.metrics.error_count.inc();
                return Err(CacheError::CacheFull);
            }
        }

        let expires_at = Some(Instant::now() + self.ttl);
        if let Some(old_size) = existing_size {
            state.current_size -= old_size;
        } else {
            self.metrics.item_count.add(1);
        }
        state
            .entries
            .insert(key.to_string(), Entry::new(value, expires_at));
        state.current_size += value_len as i64;
        self.metrics.sets.inc();
        state.evictor.on_set(key);
        Ok(())
    }

    /// Look up `key`, evicting it first if its TTL has elapsed.
    pub fn get(&self, key: &str) -> Result<Bytes, CacheError> {
        let start = Instant::now();
        let result = self.get_inner(key);
        self.metrics
            .get_latency
            .observe(start.elapsed().as_secs_f64());
        result
    }

    fn get_inner(&self, key: &str) -> Result<Bytes, CacheError> {
        let mut state = self.state.lock();

        let now = Instant::now();
        let expired = match state.entries.get(key) {
            None => {
                self.metrics.misses.inc();
                return Err(CacheError::NotFound);
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.remove_key_locked(&mut state, key);
            self.metrics.misses.inc();
            return Err(CacheError::Expired);
        }

        state.evictor.on_get(key);
        self.metrics.hits.inc();
        Ok(state
            .entries
            .get(key)
            .expect("checked above")
            .value
            .clone())
    }

    /// Remove `key` from storage, adjusting size and item-count accounting.
    /// No-op if the key is absent. Does not touch the eviction policy —
    /// callers decide whether an `on_delete` notification is appropriate.
    fn remove_key_locked(&self, state: &mut ShardState, key: &str) {
        if let Some(entry) = state.entries.remove(key) {
            state.current_size -= entry.size as i64;
            self.metrics.item_count.add(-1);
        }
    }

    /// Attempt to free `extra` additional bytes of headroom. Returns whether
    /// the shard can now admit a write of that size.
    fn make_space_locked(&self, state: &mut ShardState, extra: i64) -> bool {
        let now = Instant::now();
        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired_keys {
            self.remove_key_locked(state, &key);
        }

        if state.current_size + extra <= self.byte_budget {
            return true;
        }

        let avg = (state.current_size / (state.entries.len() as i64 + 1)).max(1);
        let short = state.current_size - (self.byte_budget - extra);
        let victims = (short / avg + 1).max(0) as usize;

        let keys = state.evictor.evict(victims);
        if keys.is_empty() {
            return false;
        }

        let mut removed = 0u64;
        for key in &keys {
            if state.entries.contains_key(key) {
                self.remove_key_locked(state, key);
                removed += 1;
            }
        }
        for _ in 0..removed {
            self.metrics.evictions.inc();
        }

        state.current_size + extra <= self.byte_budget
    }

    #[cfg(test)]
    pub(crate) fn current_size(&self) -> i64 {
        self.state.lock().current_size
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}
