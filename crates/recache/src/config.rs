//! Handler-level configuration.

use std::time::Duration;

use crate::policy::MissPolicy;

/// Immutable configuration for a [`Cache`](crate::Cache).
///
/// Built through [`CacheBuilder`](crate::CacheBuilder); the setters for the
/// bounded numeric knobs silently keep the default when handed an
/// out-of-range value, mirroring how call-level overrides behave.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Namespace prepended to every key as `prefix:key`. Empty means keys
    /// pass through unchanged.
    pub prefix: String,
    /// TTL applied when a call does not override it.
    pub default_ttl: Duration,
    /// Upper bound on the runtime of any background refresh or write task.
    pub background_refresh_timeout: Duration,
    /// Minimum gap between hit-path background refreshes of the same key.
    /// Zero disables the cooldown.
    pub refresh_cooldown: Duration,
    /// Miss behavior when a call does not override it.
    pub miss_policy: MissPolicy,
    /// TTL of the stale companion copy kept for stale-while-revalidate.
    pub stale_data_ttl: Duration,
    /// Remaining-TTL fraction in `[0, 1]` at or below which refresh-ahead
    /// triggers on a hit.
    pub refresh_ahead_threshold: f64,
    /// Multiplier for the probabilistic refresh draw; must be positive.
    pub probabilistic_beta: f64,
    /// Longest a cooperative-refresh caller waits for the per-key lock
    /// before generating without writing.
    pub cooperative_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            default_ttl: Duration::from_secs(5 * 60),
            background_refresh_timeout: Duration::from_secs(5),
            refresh_cooldown: Duration::ZERO,
            miss_policy: MissPolicy::SyncWriteThenReturn,
            stale_data_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_ahead_threshold: 0.2,
            probabilistic_beta: 1.0,
            cooperative_timeout: Duration::from_secs(10),
        }
    }
}
