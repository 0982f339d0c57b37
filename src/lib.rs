//! shardcache - an in-memory, size- and count-bounded key/value cache
//! with TTL expiry and pluggable eviction.

pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod http;
pub mod metrics;
pub mod shard;
pub mod utils;

pub use cache::{new_cache, Cache, CacheOptions};
pub use config::ProcessConfig;
pub use error::CacheError;

/// Crate version, for logging at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
