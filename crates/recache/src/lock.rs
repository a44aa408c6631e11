//! Process-local per-key mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guard returned by [`KeyedMutex`]; the key unlocks when it drops.
pub type KeyGuard = OwnedMutexGuard<()>;

/// A set of independent single-slot mutexes keyed by string.
///
/// Slots materialize on first touch and are never removed; the map's shard
/// locking covers the brief creation window. Acquisition order among waiters
/// on the same key is unspecified. Not reentrant: locking a key twice from
/// the same task deadlocks it.
#[derive(Debug, Default)]
pub struct KeyedMutex {
    slots: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        self.slots.entry(key.to_owned()).or_default().clone()
    }

    /// Wait until `key` is free and lock it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        self.slot(key).lock_owned().await
    }

    /// Lock `key` if it is free right now. `None` means another holder has
    /// it; dropping a `None` releases nothing.
    pub fn try_lock(&self, key: &str) -> Option<KeyGuard> {
        self.slot(key).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn try_lock_fails_while_held() {
        let locks = KeyedMutex::new();
        let guard = locks.lock("k").await;
        assert!(locks.try_lock("k").is_none());
        drop(guard);
        assert!(locks.try_lock("k").is_some());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let locks = KeyedMutex::new();
        let _a = locks.lock("a").await;
        assert!(locks.try_lock("b").is_some());
    }

    #[tokio::test]
    async fn released_slot_does_not_deadlock() {
        let locks = KeyedMutex::new();
        for _ in 0..3 {
            let guard = locks.lock("k").await;
            drop(guard);
        }
        let _again = locks.lock("k").await;
    }

    #[tokio::test]
    async fn at_most_one_holder_per_key() {
        let locks = Arc::new(KeyedMutex::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("hot").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
