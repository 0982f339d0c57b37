//! Routes keys to shards via a consistent-hash ring.

use crate::eviction::EvictorFactory;
use crate::metrics::Meter;
use crate::shard::shard::Shard;
use crate::utils::hash_key;
use ahash::AHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use uuid::Uuid;

/// Number of virtual-node points placed on the ring per shard, smoothing
/// key distribution across shards.
const VIRTUAL_NODES_PER_SHARD: u32 = 64;

/// Owns a fixed set of shards and the ring that routes keys to them.
/// Ring membership is immutable after construction.
pub struct ShardManager {
    shards: Vec<Shard>,
    ring: BTreeMap<u64, usize>,
    fallback_shard: usize,
}

impl ShardManager {
    pub fn new(
        shard_count: usize,
        byte_budget: usize,
        count_budget: usize,
        ttl: Duration,
        evictor_factory: &EvictorFactory,
        meter: &dyn Meter,
    ) -> Result<Self, crate::error::CacheError> {
        let mut shards = Vec::with_capacity(shard_count);
        let mut ids = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            let id = Uuid::new_v4().to_string();
            ids.push(id.clone());
            let metrics = crate::metrics::ShardMetrics::new(meter)?;
            shards.push(Shard::new(
                id,
                byte_budget,
                count_budget,
                ttl,
                evictor_factory(),
                metrics,
            ));
        }

        let mut ring = BTreeMap::new();
        for (index, id) in ids.iter().enumerate() {
            for virtual_index in 0..VIRTUAL_NODES_PER_SHARD {
                let hash = hash_virtual_point(id, virtual_index);
                ring.insert(hash, index);
            }
        }

        // Lowest shard identifier wins ties deterministically, rather than
        // relying on incidental iteration order of a ring miss.
        let fallback_shard = ids
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(index, _)| index)
            .unwrap_or(0);

        Ok(Self {
            shards,
            ring,
            fallback_shard,
        })
    }

    /// Deterministically route `key` to one of this manager's shards.
    pub fn get_shard(&self, key: &str) -> &Shard {
        if self.ring.is_empty() {
            return &self.shards[self.fallback_shard];
        }
        let hash = hash_key(key.as_bytes());
        let index = self
            .ring
            .range(hash..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, index)| *index)
            .unwrap_or(self.fallback_shard);
        &self.shards[index]
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

fn hash_virtual_point(shard_id: &str, virtual_index: u32) -> u64 {
    let mut hasher = AHasher::default();
    shard_id.hash(&mut hasher);
    virtual_index.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::lru_factory;
    use crate::metrics::recording::RecordingMeter;

    fn manager(shard_count: usize) -> ShardManager {
        let meter = RecordingMeter::new();
        ShardManager::new(
            shard_count,
            1024,
            100,
            Duration::from_secs(60),
            &lru_factory(),
            &meter,
        )
        .unwrap()
    }

    #[test]
    fn routing_is_stable() {
        let manager = manager(8);
        let first = manager.get_shard("a").id().to_string();
        let second = manager.get_shard("a").id().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn distributes_keys_across_shards() {
        let manager = manager(8);
        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            seen.insert(manager.get_shard(&format!("key-{i}")).id().to_string());
        }
        assert!(seen.len() > 1);
    }
}
