//! Per-call overrides.

use std::time::Duration;

use crate::policy::MissPolicy;

/// Options for a single `get_or_refresh` or `set` call, layered over the
/// handler defaults.
///
/// Setters for the bounded numeric knobs ignore out-of-range input and leave
/// the handler default in effect.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) ttl: Option<Duration>,
    pub(crate) disable_hit_refresh: bool,
    pub(crate) miss_policy: Option<MissPolicy>,
    pub(crate) refresh_ahead_threshold: Option<f64>,
    pub(crate) probabilistic_beta: Option<f64>,
    pub(crate) stale_check_timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the TTL for this call. A zero duration falls back to the
    /// handler default.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Skip the hit-path refresh dispatch entirely for this call.
    pub fn without_hit_refresh(mut self) -> Self {
        self.disable_hit_refresh = true;
        self
    }

    /// Override the miss policy for this call.
    pub fn miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = Some(policy);
        self
    }

    /// Override the refresh-ahead threshold; ignored unless in `[0, 1]`.
    pub fn refresh_ahead_threshold(mut self, threshold: f64) -> Self {
        if (0.0..=1.0).contains(&threshold) {
            self.refresh_ahead_threshold = Some(threshold);
        }
        self
    }

    /// Override the probabilistic refresh beta; ignored unless positive.
    pub fn probabilistic_beta(mut self, beta: f64) -> Self {
        if beta > 0.0 {
            self.probabilistic_beta = Some(beta);
        }
        self
    }

    /// Bound the stale-companion read for stale-while-revalidate. A zero
    /// duration falls back to the built-in one-second bound.
    pub fn stale_check_timeout(mut self, timeout: Duration) -> Self {
        self.stale_check_timeout = Some(timeout);
        self
    }
}
