//! Refresh bookkeeping: cooldown stamps and creation times.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Suffix for the in-memory creation-time entries consulted by the
/// probabilistic refresh math.
const CREATED_SUFFIX: &str = "@created";

/// Per-key timestamps behind a single mutex.
///
/// Tracks when each full key was last refreshed in the background (for the
/// hit-path cooldown) and, for probabilistic refresh, when its value was
/// created. Critical sections only touch the map; no I/O happens under the
/// lock. Absence of an entry means "never".
#[derive(Debug)]
pub struct RefreshLedger {
    cooldown: Duration,
    stamps: Mutex<HashMap<String, Instant>>,
}

impl RefreshLedger {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            stamps: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a background refresh for `full_key` is currently allowed.
    ///
    /// Always true when no cooldown is configured or the key has never been
    /// refreshed.
    pub fn should_refresh_now(&self, full_key: &str) -> bool {
        if self.cooldown.is_zero() {
            return true;
        }
        match self.stamps.lock().get(full_key) {
            Some(last) => last.elapsed() >= self.cooldown,
            None => true,
        }
    }

    /// Record that `full_key` was refreshed just now. A no-op when no
    /// cooldown is configured, so the map does not grow for free.
    pub fn mark_refreshed(&self, full_key: &str) {
        if self.cooldown.is_zero() {
            return;
        }
        self.stamps.lock().insert(full_key.to_owned(), Instant::now());
    }

    /// Record the creation time used by probabilistic refresh.
    pub fn mark_created(&self, full_key: &str) {
        self.stamps
            .lock()
            .insert(format!("{full_key}{CREATED_SUFFIX}"), Instant::now());
    }

    /// Creation time recorded for `full_key`, if any.
    pub fn created_at(&self, full_key: &str) -> Option<Instant> {
        self.stamps
            .lock()
            .get(&format!("{full_key}{CREATED_SUFFIX}"))
            .copied()
    }

    /// Drop both entries for `full_key` (used by invalidation).
    pub fn forget(&self, full_key: &str) {
        let mut stamps = self.stamps.lock();
        stamps.remove(full_key);
        stamps.remove(&format!("{full_key}{CREATED_SUFFIX}"));
    }
}
