//! Miss-path handlers, one per [`MissPolicy`].
//!
//! Shared conventions: the generator runs on the caller's task in every
//! synchronous flow, generator failures are wrapped as
//! [`CacheError::Generator`], and `from_cache` is false on any value
//! produced here (stale-while-revalidate is the exception: a served
//! companion copy did come from the store).

use std::sync::Arc;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::handler::{Cache, Fetched, SharedGenerator, stale_key};
use crate::options::CallOptions;
use crate::policy::MissPolicy;

/// Bound applied to the stale-companion read when the call does not set one.
const DEFAULT_STALE_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

impl<T> Cache<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    pub(crate) async fn dispatch_miss(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
        policy: MissPolicy,
        opts: CallOptions,
    ) -> Result<Fetched<T>> {
        match policy {
            MissPolicy::SyncWriteThenReturn => {
                self.miss_sync_write_then_return(key, ttl, &generator).await
            }
            MissPolicy::ReturnThenAsyncWrite => {
                self.miss_return_then_async_write(key, ttl, &generator).await
            }
            MissPolicy::StaleWhileRevalidate => {
                self.miss_stale_while_revalidate(key, ttl, generator, &opts)
                    .await
            }
            MissPolicy::FailFast => Err(CacheError::fail_fast(key)),
            MissPolicy::RefreshAhead => self.miss_refresh_ahead(key, ttl, generator, &opts).await,
            MissPolicy::CooperativeRefresh => {
                self.miss_cooperative_refresh(key, ttl, &generator).await
            }
            MissPolicy::BestEffort => self.miss_best_effort(key, ttl, &generator).await,
            MissPolicy::ProbabilisticRefresh => {
                self.miss_probabilistic_refresh(key, ttl, &generator).await
            }
        }
    }

    /// Default miss path: lock, double-check, generate, write, return.
    ///
    /// Concurrent callers serialize on the per-key lock; all but the first
    /// see the double-check succeed and return the winner's value without
    /// invoking their own generator.
    pub(crate) async fn miss_sync_write_then_return(
        &self,
        key: &str,
        ttl: Duration,
        generator: &SharedGenerator<T>,
    ) -> Result<Fetched<T>> {
        let full_key = self.full_key(key);
        let _guard = self.shared().locks.lock(&full_key).await;

        match self.get(key).await {
            Ok(hit) => return Ok(hit),
            Err(err) if err.is_miss() => {}
            Err(err) => return Err(err),
        }

        let value = generator().await.map_err(CacheError::generator)?;
        self.write_value(&full_key, &value, ttl).await?;
        Ok(Fetched::fresh(value))
    }

    /// Generate inline, return immediately, persist from a background task.
    async fn miss_return_then_async_write(
        &self,
        key: &str,
        ttl: Duration,
        generator: &SharedGenerator<T>,
    ) -> Result<Fetched<T>> {
        let value = generator().await.map_err(CacheError::generator)?;
        self.spawn_miss_write(key, ttl, value.clone());
        Ok(Fetched::fresh(value))
    }

    /// Serve the stale companion if present, refreshing both keys in the
    /// background; otherwise fall through to the sync path.
    async fn miss_stale_while_revalidate(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
        opts: &CallOptions,
    ) -> Result<Fetched<T>> {
        let stale = stale_key(&self.full_key(key));
        let stale_timeout = opts
            .stale_check_timeout
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(DEFAULT_STALE_CHECK_TIMEOUT);

        if let Ok(Ok(Some(value))) =
            tokio::time::timeout(stale_timeout, self.read_raw(&stale)).await
        {
            tracing::debug!(key = %stale, "serving stale value");
            self.spawn_stale_refresh(key, ttl, Arc::clone(&generator));
            return Ok(Fetched::cached(value));
        }

        self.miss_sync_write_then_return(key, ttl, &generator).await
    }

    /// Sync miss plus a refresh scheduled to land before the TTL runs out.
    async fn miss_refresh_ahead(
        &self,
        key: &str,
        ttl: Duration,
        generator: SharedGenerator<T>,
        opts: &CallOptions,
    ) -> Result<Fetched<T>> {
        let result = self.miss_sync_write_then_return(key, ttl, &generator).await?;
        let threshold = opts
            .refresh_ahead_threshold
            .unwrap_or(self.shared().config.refresh_ahead_threshold);
        self.spawn_delayed_refresh(key, ttl, generator, threshold);
        Ok(result)
    }

    /// Wait for the lock up to the cooperative timeout. Losing the race
    /// means generating directly and skipping the cache write, keeping the
    /// tail bounded when a key is heavily contended.
    async fn miss_cooperative_refresh(
        &self,
        key: &str,
        ttl: Duration,
        generator: &SharedGenerator<T>,
    ) -> Result<Fetched<T>> {
        let full_key = self.full_key(key);
        let coop_timeout = self.shared().config.cooperative_timeout;

        // A zero timeout must deterministically take the no-write fallback;
        // tokio's timeout polls the inner future before checking the
        // deadline, so an uncontended lock would win a zero-length race.
        if !coop_timeout.is_zero() {
            if let Ok(guard) =
                tokio::time::timeout(coop_timeout, self.shared().locks.lock(&full_key)).await
            {
                drop(guard);
                return self.miss_sync_write_then_return(key, ttl, generator).await;
            }
        }

        tracing::debug!(key = %full_key, "cooperative wait timed out, generating directly");
        let value = generator().await.map_err(CacheError::generator)?;
        Ok(Fetched::fresh(value))
    }

    /// Generate, tolerating failure: a failed generator yields the default
    /// value, a failed write is ignored, and neither surfaces an error.
    async fn miss_best_effort(
        &self,
        key: &str,
        ttl: Duration,
        generator: &SharedGenerator<T>,
    ) -> Result<Fetched<T>> {
        let full_key = self.full_key(key);
        let value = match generator().await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(key = %full_key, error = %err, "generator failed, serving default");
                return Ok(Fetched::fresh(T::default()));
            }
        };

        if let Err(err) = self.write_value(&full_key, &value, ttl).await {
            tracing::warn!(key = %full_key, error = %err, "best-effort cache write failed");
        }
        Ok(Fetched::fresh(value))
    }

    /// Sync miss plus the creation stamp consulted by the hit-path
    /// probabilistic draw. Stamped on the caller's task rather than from a
    /// spawned one, which narrows the window where a hit sees no stamp.
    async fn miss_probabilistic_refresh(
        &self,
        key: &str,
        ttl: Duration,
        generator: &SharedGenerator<T>,
    ) -> Result<Fetched<T>> {
        let result = self.miss_sync_write_then_return(key, ttl, generator).await?;
        self.shared().ledger.mark_created(&self.full_key(key));
        Ok(result)
    }
}
