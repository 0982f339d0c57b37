//! Error taxonomy for the cache engine and its construction.

use thiserror::Error;

/// Errors returned by `Cache::get` and `Cache::set`, and by cache construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// `get` found no entry for the key.
    #[error("key not found")]
    NotFound,

    /// `get` found an entry whose TTL had elapsed; the entry was removed.
    #[error("key expired")]
    Expired,

    /// `set` was called with an empty value.
    #[error("value must not be empty")]
    InvalidValue,

    /// The value's byte length exceeds the shard's byte budget.
    #[error("value too large for shard budget")]
    ValueTooLarge,

    /// Admitting a new key would exceed the shard's entry-count budget.
    #[error("too many keys in shard")]
    TooManyKeys,

    /// The make-space loop could not free enough bytes for the write.
    #[error("cache is full")]
    CacheFull,

    /// A construction-time option failed validation.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}
