//! Backend store abstraction.
//!
//! The facade only needs four primitives from a Redis-compatible store plus
//! deletion for invalidation. Implementations live in their own crates
//! (`recache-memory`, `recache-redis`) so applications pull in only the
//! backend they deploy.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Byte-level key-value store with per-key TTL.
///
/// `get` returning `Ok(None)` is the distinguished "absent" signal; transport
/// failures must be reported as errors so the read path can tell the two
/// apart.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value at `key`, or `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write `value` at `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Whether `key` currently holds a live value.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remaining time to live for `key`. `None` means the key is missing or
    /// carries no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
