//! A single stored record.

use bytes::Bytes;
use std::time::Instant;

/// A stored value plus its expiry instant and byte size.
///
/// `value` is refcounted `Bytes` rather than an owned `Vec<u8>` so a cache
/// hit can hand the caller a clone without copying the backing buffer.
///
/// `expires_at` is `None` for a never-expiring sentinel; in practice every
/// entry written through [`crate::shard::shard::Shard::set`] carries a TTL,
/// but the sentinel keeps the expiry check total rather than relying on a
/// magic `Instant` value.
pub struct Entry {
    pub value: Bytes,
    pub expires_at: Option<Instant>,
    pub size: usize,
}

impl Entry {
    pub fn new(value: Bytes, expires_at: Option<Instant>) -> Self {
        let size = value.len();
        Self {
            value,
            expires_at,
            size,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}
