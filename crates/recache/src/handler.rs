//! The cache handler: typed facade over a byte store.
//!
//! ## Read path
//!
//! ```text
//! get_or_refresh(key) → store get → hit?  → maybe schedule refresh → return
//!                                 → miss? → miss-policy handler
//!                                             ├─ lock / double-check / generate / write
//!                                             └─ or background task
//! ```
//!
//! The handler is cheap to clone; clones share the store handle, per-key
//! locks, refresh ledger, and counters. Background tasks run on handler
//! clones and never borrow from the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::codec::{Codec, JsonCodec};
use crate::config::CacheConfig;
use crate::error::{BoxError, CacheError, Result};
use crate::ledger::RefreshLedger;
use crate::lock::KeyedMutex;
use crate::options::CallOptions;
use crate::policy::MissPolicy;
use crate::stats::{CacheStats, StatCounters};
use crate::store::CacheStore;

/// Type-erased generator shared between the caller's path and any background
/// task spawned on its behalf.
pub(crate) type SharedGenerator<T> =
    Arc<dyn Fn() -> BoxFuture<'static, std::result::Result<T, BoxError>> + Send + Sync>;

/// A value returned by the cache, with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    /// False when the value was produced by the generator during this call.
    pub from_cache: bool,
    /// When the value was read from or written to the store.
    pub cached_at: OffsetDateTime,
}

impl<T> Fetched<T> {
    pub(crate) fn cached(value: T) -> Self {
        Self {
            value,
            from_cache: true,
            cached_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn fresh(value: T) -> Self {
        Self {
            value,
            from_cache: false,
            cached_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

pub(crate) struct Shared<T> {
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) codec: Box<dyn Codec<T>>,
    pub(crate) config: CacheConfig,
    pub(crate) locks: KeyedMutex,
    pub(crate) ledger: RefreshLedger,
    pub(crate) counters: StatCounters,
}

/// Typed read-through cache over a [`CacheStore`].
///
/// Reads go to the store first; misses are resolved by the configured
/// [`MissPolicy`], which decides whether to generate synchronously under the
/// per-key lock, serve stale data, hand off to a background task, or fail.
/// Hits may schedule a background refresh depending on the policy, the
/// refresh cooldown, and the entry's age.
pub struct Cache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Cache<T> {
    /// Start building a cache over `store`.
    pub fn builder(store: Arc<dyn CacheStore>) -> CacheBuilder<T> {
        CacheBuilder {
            store,
            codec: None,
            config: CacheConfig::default(),
        }
    }

    pub(crate) fn shared(&self) -> &Shared<T> {
        &self.shared
    }

    /// The namespaced key actually sent to the store.
    pub(crate) fn full_key(&self, key: &str) -> String {
        if self.shared.config.prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{}:{}", self.shared.config.prefix, key)
        }
    }

    pub(crate) fn effective_ttl(&self, opts: &CallOptions) -> Duration {
        opts.ttl
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.shared.config.default_ttl)
    }

    /// Counters snapshot for monitoring.
    pub fn stats(&self) -> CacheStats {
        self.shared.counters.snapshot()
    }
}

/// The stale companion key for stale-while-revalidate.
pub(crate) fn stale_key(full_key: &str) -> String {
    format!("{full_key}:stale")
}

impl<T> Cache<T>
where
    T: Send + Sync + 'static,
{
    /// Fetch and decode the value at `key`.
    ///
    /// An absent key returns the distinguished [`CacheError::Miss`]; check
    /// it with [`CacheError::is_miss`]. Store and decode failures are
    /// returned as their own variants.
    pub async fn get(&self, key: &str) -> Result<Fetched<T>> {
        let full_key = self.full_key(key);
        let Some(bytes) = self.shared.store.get(&full_key).await? else {
            self.shared.counters.record_miss();
            tracing::debug!(key = %full_key, "cache miss");
            return Err(CacheError::miss(key));
        };
        let value = self
            .shared
            .codec
            .decode(&bytes)
            .map_err(CacheError::Decode)?;
        self.shared.counters.record_hit();
        tracing::debug!(key = %full_key, "cache hit");
        Ok(Fetched::cached(value))
    }

    /// Encode and write `value` at `key` with the effective TTL.
    pub async fn set(&self, key: &str, value: &T, opts: CallOptions) -> Result<()> {
        let ttl = self.effective_ttl(&opts);
        let full_key = self.full_key(key);
        self.write_value(&full_key, value, ttl).await
    }

    /// Remove `key`, its stale companion, and its ledger entries.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key);
        self.shared.store.delete(&full_key).await?;
        self.shared.store.delete(&stale_key(&full_key)).await?;
        self.shared.ledger.forget(&full_key);
        tracing::debug!(key = %full_key, "cache invalidated");
        Ok(())
    }

    /// The single write pathway for main keys: encode, store with TTL, then
    /// stamp the ledger for cooldown accounting.
    pub(crate) async fn write_value(&self, full_key: &str, value: &T, ttl: Duration) -> Result<()> {
        let bytes = self
            .shared
            .codec
            .encode(value)
            .map_err(CacheError::Encode)?;
        self.shared.store.set(full_key, bytes, ttl).await?;
        self.shared.ledger.mark_refreshed(full_key);
        Ok(())
    }

    /// Write to an arbitrary full key (the stale companion) without touching
    /// the ledger.
    pub(crate) async fn write_companion(
        &self,
        full_key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let bytes = self
            .shared
            .codec
            .encode(value)
            .map_err(CacheError::Encode)?;
        self.shared.store.set(full_key, bytes, ttl).await?;
        Ok(())
    }

    /// Fetch and decode an arbitrary full key. `Ok(None)` when absent.
    pub(crate) async fn read_raw(&self, full_key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.shared.store.get(full_key).await? else {
            return Ok(None);
        };
        let value = self
            .shared
            .codec
            .decode(&bytes)
            .map_err(CacheError::Decode)?;
        Ok(Some(value))
    }
}

impl<T> Cache<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Read `key`, falling back to `generator` under the effective miss
    /// policy when the store does not have it.
    ///
    /// On a hit the cached value is returned immediately; depending on the
    /// policy a background refresh may be scheduled first, which never
    /// delays the return and never surfaces its own errors. On a miss the
    /// policy decides whether the generator runs synchronously under the
    /// per-key lock, in the background, or not at all.
    pub async fn get_or_refresh<G, Fut>(
        &self,
        key: &str,
        generator: G,
        opts: CallOptions,
    ) -> Result<Fetched<T>>
    where
        G: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, BoxError>> + Send + 'static,
    {
        let generator: SharedGenerator<T> = Arc::new(move || {
            Box::pin(generator()) as BoxFuture<'static, std::result::Result<T, BoxError>>
        });
        self.get_or_refresh_inner(key, generator, opts).await
    }

    async fn get_or_refresh_inner(
        &self,
        key: &str,
        generator: SharedGenerator<T>,
        opts: CallOptions,
    ) -> Result<Fetched<T>> {
        let ttl = self.effective_ttl(&opts);
        let policy = opts.miss_policy.unwrap_or(self.shared.config.miss_policy);

        match self.get(key).await {
            Ok(hit) => {
                if !opts.disable_hit_refresh {
                    self.handle_hit_refresh(key, ttl, generator, policy, &opts);
                }
                Ok(hit)
            }
            Err(err) if err.is_miss() => self.dispatch_miss(key, ttl, generator, policy, opts).await,
            Err(err) => Err(err),
        }
    }
}

/// Builder for [`Cache`]. Obtained from [`Cache::builder`].
pub struct CacheBuilder<T> {
    store: Arc<dyn CacheStore>,
    codec: Option<Box<dyn Codec<T>>>,
    config: CacheConfig,
}

impl<T> CacheBuilder<T> {
    /// Namespace prefix; keys become `prefix:key`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// TTL used when a call does not override it.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Bound on how long any background refresh or write may run.
    pub fn background_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.config.background_refresh_timeout = timeout;
        self
    }

    /// Minimum gap between hit-path refreshes of the same key.
    pub fn refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.refresh_cooldown = cooldown;
        self
    }

    /// Default miss behavior.
    pub fn miss_policy(mut self, policy: MissPolicy) -> Self {
        self.config.miss_policy = policy;
        self
    }

    /// How long the stale companion copy outlives the main entry.
    pub fn stale_data_ttl(mut self, ttl: Duration) -> Self {
        self.config.stale_data_ttl = ttl;
        self
    }

    /// Default refresh-ahead threshold; ignored unless in `[0, 1]`.
    pub fn refresh_ahead_threshold(mut self, threshold: f64) -> Self {
        if (0.0..=1.0).contains(&threshold) {
            self.config.refresh_ahead_threshold = threshold;
        }
        self
    }

    /// Default probabilistic refresh beta; ignored unless positive.
    pub fn probabilistic_beta(mut self, beta: f64) -> Self {
        if beta > 0.0 {
            self.config.probabilistic_beta = beta;
        }
        self
    }

    /// Longest a cooperative-refresh caller waits for the per-key lock.
    pub fn cooperative_timeout(mut self, timeout: Duration) -> Self {
        self.config.cooperative_timeout = timeout;
        self
    }

    /// Replace the default JSON codec.
    pub fn codec(mut self, codec: impl Codec<T> + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }
}

impl<T> CacheBuilder<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn build(self) -> Cache<T> {
        let cooldown = self.config.refresh_cooldown;
        Cache {
            shared: Arc::new(Shared {
                store: self.store,
                codec: self.codec.unwrap_or_else(|| Box::new(JsonCodec)),
                config: self.config,
                locks: KeyedMutex::new(),
                ledger: RefreshLedger::new(cooldown),
                counters: StatCounters::default(),
            }),
        }
    }
}
