//! Hit-path refresh decisions and the background task bodies.
//!
//! Every background task is detached from the caller: it runs on a handler
//! clone, bounds itself with the configured background-refresh timeout, and
//! swallows every error after tracing it. The hit-path dispatch itself never
//! performs store I/O, so a hit returns as fast as the store read allows.

use std::time::Duration;

use crate::handler::{Cache, SharedGenerator, stale_key};
use crate::options::CallOptions;
use crate::policy::MissPolicy;

impl<T> Cache<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Decide, after a hit, whether to schedule a background refresh.
    ///
    /// RefreshAhead defers its remaining-TTL probe into the spawned task so
    /// the hit return is never delayed by a store round-trip. The
    /// probabilistic and cooldown checks are in-memory and run inline.
    pub(crate) fn handle_hit_refresh(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
        policy: MissPolicy,
        opts: &CallOptions,
    ) {
        let full_key = self.full_key(key);
        match policy {
            MissPolicy::RefreshAhead => {
                let threshold = opts
                    .refresh_ahead_threshold
                    .unwrap_or(self.shared().config.refresh_ahead_threshold);
                self.spawn_refresh_ahead_probe(key, ttl, generator, threshold);
            }
            MissPolicy::ProbabilisticRefresh => {
                let beta = opts
                    .probabilistic_beta
                    .unwrap_or(self.shared().config.probabilistic_beta);
                if self.should_probabilistic_refresh(&full_key, ttl, beta) {
                    self.spawn_background_refresh(key, ttl, generator);
                }
            }
            _ => {
                if self.shared().ledger.should_refresh_now(&full_key) {
                    self.spawn_background_refresh(key, ttl, generator);
                }
            }
        }
    }

    /// Probabilistic early-refresh draw: refresh with probability
    /// `(age / ttl) * beta`. No creation stamp means no draw.
    fn should_probabilistic_refresh(&self, full_key: &str, ttl: Duration, beta: f64) -> bool {
        let Some(created) = self.shared().ledger.created_at(full_key) else {
            return false;
        };
        if ttl.is_zero() {
            return false;
        }
        let age_ratio = created.elapsed().as_secs_f64() / ttl.as_secs_f64();
        rand::random::<f64>() < age_ratio * beta
    }

    /// Probe the remaining TTL off the caller's path and refresh when the
    /// remaining fraction of the original TTL has sunk to the threshold.
    fn spawn_refresh_ahead_probe(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
        threshold: f64,
    ) {
        let cache = self.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            let budget = cache.shared().config.background_refresh_timeout;
            let outcome = tokio::time::timeout(budget, async {
                if cache.remaining_ratio_at_or_below(&key, ttl, threshold).await {
                    cache.background_refresh(&key, ttl, generator).await;
                }
            })
            .await;
            if outcome.is_err() {
                tracing::debug!(key = %key, "refresh-ahead probe timed out");
            }
        });
    }

    /// Whether the key's remaining TTL, as a fraction of `original_ttl`, is
    /// at or below `threshold`. A failed probe or an expired key reads as
    /// "no".
    async fn remaining_ratio_at_or_below(
        &self,
        key: &str,
        original_ttl: Duration,
        threshold: f64,
    ) -> bool {
        let full_key = self.full_key(key);
        let remaining = match self.shared().store.ttl(&full_key).await {
            Ok(Some(remaining)) if !remaining.is_zero() => remaining,
            Ok(_) => return false,
            Err(err) => {
                tracing::debug!(key = %full_key, error = %err, "ttl probe failed");
                return false;
            }
        };
        if original_ttl.is_zero() {
            return false;
        }
        remaining.as_secs_f64() / original_ttl.as_secs_f64() <= threshold
    }

    /// Standard background refresh: try-lock, honor the cooldown, generate,
    /// write. Skips silently when another task already holds the key.
    pub(crate) fn spawn_background_refresh(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
    ) {
        let cache = self.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            let budget = cache.shared().config.background_refresh_timeout;
            if tokio::time::timeout(budget, cache.background_refresh(&key, ttl, generator))
                .await
                .is_err()
            {
                tracing::debug!(key = %key, "background refresh timed out");
            }
        });
    }

    async fn background_refresh(&self, key: &str, ttl: Duration, generator: SharedGenerator<T>) {
        let full_key = self.full_key(key);
        let Some(_guard) = self.shared().locks.try_lock(&full_key) else {
            return;
        };
        if !self.shared().ledger.should_refresh_now(&full_key) {
            return;
        }
        let value = match generator().await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(key = %full_key, error = %err, "background refresh generator failed");
                return;
            }
        };
        match self.write_value(&full_key, &value, ttl).await {
            Ok(()) => self.shared().counters.record_background_refresh(),
            Err(err) => {
                tracing::warn!(key = %full_key, error = %err, "background refresh write failed");
            }
        }
    }

    /// Persist a value generated by the return-then-async-write miss path.
    /// Double-checks the key is still absent so a faster writer wins.
    pub(crate) fn spawn_miss_write(&self, key: &str, ttl: Duration, value: T) {
        let cache = self.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            let budget = cache.shared().config.background_refresh_timeout;
            if tokio::time::timeout(budget, cache.background_miss_write(&key, ttl, value))
                .await
                .is_err()
            {
                tracing::debug!(key = %key, "background miss write timed out");
            }
        });
    }

    async fn background_miss_write(&self, key: &str, ttl: Duration, value: T) {
        let full_key = self.full_key(key);
        let Some(_guard) = self.shared().locks.try_lock(&full_key) else {
            return;
        };
        match self.shared().store.exists(&full_key).await {
            Ok(false) => {}
            Ok(true) => return,
            Err(err) => {
                tracing::debug!(key = %full_key, error = %err, "existence probe failed");
                return;
            }
        }
        if let Err(err) = self.write_value(&full_key, &value, ttl).await {
            tracing::warn!(key = %full_key, error = %err, "background miss write failed");
        }
    }

    /// Refresh both the main key and its stale companion after a
    /// stale-while-revalidate hit served old data.
    pub(crate) fn spawn_stale_refresh(&self, key: &str, ttl: Duration, generator: SharedGenerator<T>) {
        let cache = self.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            let budget = cache.shared().config.background_refresh_timeout;
            if tokio::time::timeout(budget, cache.background_stale_refresh(&key, ttl, generator))
                .await
                .is_err()
            {
                tracing::debug!(key = %key, "stale refresh timed out");
            }
        });
    }

    async fn background_stale_refresh(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
    ) {
        let full_key = self.full_key(key);
        let Some(_guard) = self.shared().locks.try_lock(&full_key) else {
            return;
        };
        let value = match generator().await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(key = %full_key, error = %err, "stale refresh generator failed");
                return;
            }
        };
        if let Err(err) = self.write_value(&full_key, &value, ttl).await {
            tracing::warn!(key = %full_key, error = %err, "stale refresh main write failed");
        }
        let companion = stale_key(&full_key);
        let stale_ttl = self.shared().config.stale_data_ttl;
        if let Err(err) = self.write_companion(&companion, &value, stale_ttl).await {
            tracing::warn!(key = %companion, error = %err, "stale companion write failed");
        }
    }

    /// Sleep until the entry is near expiry, then refresh it if it still
    /// exists. The sleep runs outside the background budget; only the probe
    /// and refresh are bounded by it.
    pub(crate) fn spawn_delayed_refresh(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
        threshold: f64,
    ) {
        let cache = self.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            let delay = ttl.mul_f64((1.0 - threshold).clamp(0.0, 1.0));
            tokio::time::sleep(delay).await;

            let budget = cache.shared().config.background_refresh_timeout;
            let outcome = tokio::time::timeout(budget, async {
                match cache.shared().store.exists(&cache.full_key(&key)).await {
                    Ok(true) => cache.background_refresh(&key, ttl, generator).await,
                    Ok(false) => {}
                    Err(err) => {
                        tracing::debug!(key = %key, error = %err, "existence probe failed");
                    }
                }
            })
            .await;
            if outcome.is_err() {
                tracing::debug!(key = %key, "delayed refresh timed out");
            }
        });
    }
}
