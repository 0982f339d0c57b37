//! Metrics surface: a passive bundle of counter and histogram handles that
//! shards increment synchronously while holding their shard lock.
//!
//! The engine never talks to a concrete metrics backend directly. It asks an
//! injected [`Meter`] for named handles at construction time and then only
//! ever touches those handles. Swapping [`recording::RecordingMeter`] for
//! [`prometheus::PrometheusMeter`] changes nothing about cache behavior.

pub mod prometheus;
pub mod recording;

use crate::error::CacheError;
use std::sync::Arc;

/// Monotonically increasing integer counter handle.
pub trait IntCounter: Send + Sync {
    fn inc(&self);
}

/// Monotonically increasing floating-point counter handle.
pub trait FloatCounter: Send + Sync {
    fn inc(&self);
}

/// Signed accumulator handle (used for `cache_item_count`, which moves up and
/// down as entries are admitted and removed).
pub trait Gauge: Send + Sync {
    fn add(&self, delta: i64);
}

/// Sample-recording histogram handle.
pub trait Histogram: Send + Sync {
    fn observe(&self, value: f64);
}

/// Name constants the core requires handles for. A [`Meter`] implementation
/// must be able to produce a handle for each of these.
pub mod names {
    pub const HITS: &str = "cache_hits";
    pub const MISSES: &str = "cache_misses";
    pub const SETS: &str = "cache_sets";
    pub const EVICTIONS: &str = "cache_evictions";
    pub const ITEM_COUNT: &str = "cache_item_count";
    pub const GET_LATENCY: &str = "cache_get_latency";
    pub const ERROR_COUNT: &str = "cache_error_count";
}

/// Factory for the handle types a shard needs. Implementations must be able
/// to create a handle for every name under [`names`]; construction of a
/// [`ShardMetrics`] fails if any handle cannot be created.
pub trait Meter: Send + Sync {
    fn int_counter(&self, name: &'static str) -> Result<Arc<dyn IntCounter>, CacheError>;
    fn float_counter(&self, name: &'static str) -> Result<Arc<dyn FloatCounter>, CacheError>;
    fn gauge(&self, name: &'static str) -> Result<Arc<dyn Gauge>, CacheError>;
    fn histogram(&self, name: &'static str) -> Result<Arc<dyn Histogram>, CacheError>;
}

/// The handles a single shard holds and increments while under its own lock.
///
/// Every shard gets its own `ShardMetrics`, but handles created from the same
/// named metric on the same meter are expected to aggregate (a Prometheus
/// counter with a fixed name is one global time series regardless of how
/// many shards hold a clone of its handle).
#[derive(Clone)]
pub struct ShardMetrics {
    pub hits: Arc<dyn IntCounter>,
    pub misses: Arc<dyn IntCounter>,
    pub sets: Arc<dyn IntCounter>,
    pub evictions: Arc<dyn IntCounter>,
    pub item_count: Arc<dyn Gauge>,
    pub get_latency: Arc<dyn Histogram>,
    pub error_count: Arc<dyn FloatCounter>,
}

impl ShardMetrics {
    /// Create the full handle bundle from a meter. Fails if any handle
    /// cannot be created, aborting cache construction.
    pub fn new(meter: &dyn Meter) -> Result<Self, CacheError> {
        Ok(Self {
            hits: meter.int_counter(names::HITS)?,
            misses: meter.int_counter(names::MISSES)?,
            sets: meter.int_counter(names::SETS)?,
            evictions: meter.int_counter(names::EVICTIONS)?,
            item_count: meter.gauge(names::ITEM_COUNT)?,
            get_latency: meter.histogram(names::GET_LATENCY)?,
            error_count: meter.float_counter(names::ERROR_COUNT)?,
        })
    }
}
