//! In-memory [`CacheStore`] backend.
//!
//! Single-process storage over a concurrent map with lazy TTL expiry:
//! expired entries are dropped when touched, not swept. Suitable for tests,
//! local development, and single-instance deployments that do not want a
//! network hop.
//!
//! For tests the store can simulate a slow or failing backend: a fixed
//! latency applied to every operation, and a fault flag that makes every
//! operation return a connection error until cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use recache::{CacheStore, StoreError};

struct StoredEntry {
    data: Vec<u8>,
    stored_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }

    fn remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.stored_at.elapsed())
    }
}

/// Thread-safe in-memory byte store with per-entry TTL.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
    latency: Option<Duration>,
    failing: AtomicBool,
    failing_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that sleeps for `latency` before serving any operation,
    /// simulating a remote backend.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail with a connection error until
    /// called again with `false`.
    pub fn fail_operations(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only `set` fail, leaving reads intact. Lets tests exercise the
    /// write-failure paths without breaking the read-through probe.
    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn simulate_remote(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::connection("injected fault"));
        }
        Ok(())
    }

    /// Remove the entry if it has expired; returns true when a live entry
    /// remains.
    fn prune(&self, key: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return true;
            }
            drop(entry);
            self.entries.remove(key);
        }
        false
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.simulate_remote().await?;
        if !self.prune(key) {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.data.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        self.simulate_remote().await?;
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::command("injected write fault"));
        }
        self.entries.insert(
            key.to_owned(),
            StoredEntry {
                data: value,
                stored_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.simulate_remote().await?;
        Ok(self.prune(key))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.simulate_remote().await?;
        if !self.prune(key) {
            return Ok(None);
        }
        Ok(self.entries.get(key).and_then(|entry| entry.remaining()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.simulate_remote().await?;
        self.entries.remove(key);
        Ok(())
    }
}
