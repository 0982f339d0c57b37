//! Prometheus-backed [`Meter`], used by the process entry point.
//!
//! Every shard asks the same [`PrometheusMeter`] for handles under the same
//! seven names, so a handle is registered with the [`prometheus::Registry`]
//! exactly once per name and then cloned out of an internal cache for every
//! later call — re-registering a metric of the same name with the `prometheus`
//! crate is an error, not a no-op.

use super::{FloatCounter, Gauge, Histogram, IntCounter, Meter, names};
use crate::error::CacheError;
use parking_lot::Mutex;
use prometheus::{
    Counter as PCounter, Histogram as PHistogram, IntCounter as PIntCounter, IntGauge, Opts,
    Registry,
};
use std::collections::HashMap;
use std::sync::Arc;

impl IntCounter for PIntCounter {
    fn inc(&self) {
        PIntCounter::inc(self);
    }
}

impl FloatCounter for PCounter {
    fn inc(&self) {
        PCounter::inc(self);
    }
}

impl Gauge for IntGauge {
    fn add(&self, delta: i64) {
        IntGauge::add(self, delta);
    }
}

impl Histogram for PHistogram {
    fn observe(&self, value: f64) {
        PHistogram::observe(self, value);
    }
}

#[derive(Default)]
struct HandleCache {
    int_counters: HashMap<&'static str, Arc<dyn IntCounter>>,
    float_counters: HashMap<&'static str, Arc<dyn FloatCounter>>,
    gauges: HashMap<&'static str, Arc<dyn Gauge>>,
    histograms: HashMap<&'static str, Arc<dyn Histogram>>,
}

/// A [`Meter`] that registers handles with a `prometheus::Registry` and
/// serves the same registry to the `/metrics` HTTP route.
pub struct PrometheusMeter {
    registry: Registry,
    cache: Mutex<HandleCache>,
}

impl PrometheusMeter {
    /// Create a meter backed by a fresh registry.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            cache: Mutex::new(HandleCache::default()),
        }
    }

    /// The registry backing this meter, for exposition over `/metrics`.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the current state of every registered metric in the
    /// Prometheus text-exposition format.
    pub fn gather_text(&self) -> Result<String, CacheError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| CacheError::InvalidConfig(format!("failed to encode metrics: {e}")))?;
        String::from_utf8(buf)
            .map_err(|e| CacheError::InvalidConfig(format!("non-utf8 metrics output: {e}")))
    }
}

impl Default for PrometheusMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter for PrometheusMeter {
    fn int_counter(&self, name: &'static str) -> Result<Arc<dyn IntCounter>, CacheError> {
        let mut cache = self.cache.lock();
        if let Some(existing) = cache.int_counters.get(name) {
            return Ok(existing.clone());
        }
        let metric = PIntCounter::with_opts(Opts::new(name, help_for(name)))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        self.registry
            .register(Box::new(metric.clone()))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        let handle: Arc<dyn IntCounter> = Arc::new(metric);
        cache.int_counters.insert(name, handle.clone());
        Ok(handle)
    }

    fn float_counter(&self, name: &'static str) -> Result<Arc<dyn FloatCounter>, CacheError> {
        let mut cache = self.cache.lock();
        if let Some(existing) = cache.float_counters.get(name) {
            return Ok(existing.clone());
        }
        let metric = PCounter::with_opts(Opts::new(name, help_for(name)))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        self.registry
            .register(Box::new(metric.clone()))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        let handle: Arc<dyn FloatCounter> = Arc::new(metric);
        cache.float_counters.insert(name, handle.clone());
        Ok(handle)
    }

    fn gauge(&self, name: &'static str) -> Result<Arc<dyn Gauge>, CacheError> {
        let mut cache = self.cache.lock();
        if let Some(existing) = cache.gauges.get(name) {
            return Ok(existing.clone());
        }
        let metric = IntGauge::with_opts(Opts::new(name, help_for(name)))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        self.registry
            .register(Box::new(metric.clone()))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        let handle: Arc<dyn Gauge> = Arc::new(metric);
        cache.gauges.insert(name, handle.clone());
        Ok(handle)
    }

    fn histogram(&self, name: &'static str) -> Result<Arc<dyn Histogram>, CacheError> {
        let mut cache = self.cache.lock();
        if let Some(existing) = cache.histograms.get(name) {
            return Ok(existing.clone());
        }
        let metric = PHistogram::with_opts(prometheus::HistogramOpts::new(name, help_for(name)))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        self.registry
            .register(Box::new(metric.clone()))
            .map_err(|e| CacheError::InvalidConfig(format!("{name}: {e}")))?;
        let handle: Arc<dyn Histogram> = Arc::new(metric);
        cache.histograms.insert(name, handle.clone());
        Ok(handle)
    }
}

fn help_for(name: &str) -> String {
    match name {
        names::HITS => "Cache lookups that found a live entry".to_string(),
        names::MISSES => "Cache lookups that found no live entry".to_string(),
        names::SETS => "Successful writes".to_string(),
        names::EVICTIONS => "Entries removed to make space for a write".to_string(),
        names::ITEM_COUNT => "Current number of live entries".to_string(),
        names::GET_LATENCY => "Lookup latency in seconds".to_string(),
        names::ERROR_COUNT => "Operations that returned an error".to_string(),
        other => format!("shardcache metric {other}"),
    }
}
