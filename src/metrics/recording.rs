//! In-process meter that records into plain atomics.
//!
//! Used as the default meter for embedding the engine as a library and as
//! the metrics surface in tests that need to assert on counter values
//! without standing up a Prometheus registry.

use super::{FloatCounter, Gauge, Histogram, IntCounter, Meter, names};
use crate::error::CacheError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

struct AtomicIntCounter(AtomicU64);

impl IntCounter for AtomicIntCounter {
    fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

struct AtomicGauge(AtomicI64);

impl Gauge for AtomicGauge {
    fn add(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }
}

struct MutexFloatCounter(Mutex<f64>);

impl FloatCounter for MutexFloatCounter {
    fn inc(&self) {
        *self.0.lock() += 1.0;
    }
}

struct RecordingHistogram(Mutex<Vec<f64>>);

impl Histogram for RecordingHistogram {
    fn observe(&self, value: f64) {
        self.0.lock().push(value);
    }
}

/// A [`Meter`] backed by plain atomics, with accessors for test assertions.
pub struct RecordingMeter {
    hits: Arc<AtomicIntCounter>,
    misses: Arc<AtomicIntCounter>,
    sets: Arc<AtomicIntCounter>,
    evictions: Arc<AtomicIntCounter>,
    item_count: Arc<AtomicGauge>,
    get_latency: Arc<RecordingHistogram>,
    error_count: Arc<MutexFloatCounter>,
}

impl Default for RecordingMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMeter {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicIntCounter(AtomicU64::new(0))),
            misses: Arc::new(AtomicIntCounter(AtomicU64::new(0))),
            sets: Arc::new(AtomicIntCounter(AtomicU64::new(0))),
            evictions: Arc::new(AtomicIntCounter(AtomicU64::new(0))),
            item_count: Arc::new(AtomicGauge(AtomicI64::new(0))),
            get_latency: Arc::new(RecordingHistogram(Mutex::new(Vec::new()))),
            error_count: Arc::new(MutexFloatCounter(Mutex::new(0.0))),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.0.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.0.load(Ordering::Relaxed)
    }

    pub fn sets(&self) -> u64 {
        self.sets.0.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.0.load(Ordering::Relaxed)
    }

    pub fn item_count(&self) -> i64 {
        self.item_count.0.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> f64 {
        *self.error_count.0.lock()
    }

    pub fn get_latency_samples(&self) -> Vec<f64> {
        self.get_latency.0.lock().clone()
    }
}

impl Meter for RecordingMeter {
    fn int_counter(&self, name: &'static str) -> Result<Arc<dyn IntCounter>, CacheError> {
        match name {
            names::HITS => Ok(self.hits.clone()),
            names::MISSES => Ok(self.misses.clone()),
            names::SETS => Ok(self.sets.clone()),
            names::EVICTIONS => Ok(self.evictions.clone()),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown int counter: {other}"
            ))),
        }
    }

    fn float_counter(&self, name: &'static str) -> Result<Arc<dyn FloatCounter>, CacheError> {
        match name {
            names::ERROR_COUNT => Ok(self.error_count.clone()),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown float counter: {other}"
            ))),
        }
    }

    fn gauge(&self, name: &'static str) -> Result<Arc<dyn Gauge>, CacheError> {
        match name {
            names::ITEM_COUNT => Ok(self.item_count.clone()),
            other => Err(CacheError::InvalidConfig(format!("unknown gauge: {other}"))),
        }
    }

    fn histogram(&self, name: &'static str) -> Result<Arc<dyn Histogram>, CacheError> {
        match name {
            names::GET_LATENCY => Ok(self.get_latency.clone()),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown histogram: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_handles_across_calls() {
        let meter = RecordingMeter::new();
        let a = meter.int_counter(names::HITS).unwrap();
        let b = meter.int_counter(names::HITS).unwrap();
        a.inc();
        b.inc();
        assert_eq!(meter.hits(), 2);
    }

    #[test]
    fn rejects_unknown_names() {
        let meter = RecordingMeter::new();
        assert!(meter.int_counter("bogus").is_err());
    }
}
