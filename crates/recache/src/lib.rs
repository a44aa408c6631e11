//! Typed read-through caching over a Redis-compatible store.
//!
//! The store keeps the bytes; this crate supplies the policy engine around
//! it. Callers hand [`Cache::get_or_refresh`] a *generator* closure that can
//! produce the authoritative value for a key, and the configured
//! [`MissPolicy`] decides what a miss costs: wait under the per-key lock,
//! serve a stale copy, generate in the background, or fail fast. Hits may
//! schedule a background refresh, throttled by a per-key cooldown or driven
//! by entry age.
//!
//! ## What the facade guarantees
//!
//! - **Single flight per key.** Concurrent first-time callers for the same
//!   missing key invoke the generator once; everyone else observes the
//!   winner's write through a double-checked read under the key's lock.
//! - **Non-blocking hits.** Refresh scheduling after a hit never performs
//!   store I/O on the caller's path.
//! - **Contained background work.** Every spawned task bounds itself with
//!   the background-refresh timeout and never surfaces an error to any
//!   caller.
//!
//! Mutual exclusion is process-local; running multiple instances against
//! one store means at most one generator call per key *per process*.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use recache::{Cache, CallOptions, CacheStore, MissPolicy};
//!
//! # async fn demo(store: Arc<dyn CacheStore>) -> recache::Result<()> {
//! let cache: Cache<String> = Cache::builder(store)
//!     .prefix("myapp")
//!     .default_ttl(Duration::from_secs(60))
//!     .miss_policy(MissPolicy::SyncWriteThenReturn)
//!     .build();
//!
//! let fetched = cache
//!     .get_or_refresh(
//!         "user:123",
//!         || async { Ok("fresh user data".to_string()) },
//!         CallOptions::new(),
//!     )
//!     .await?;
//! println!("{} (from cache: {})", fetched.value, fetched.from_cache);
//! # Ok(())
//! # }
//! ```
//!
//! Store backends live in `recache-memory` and `recache-redis`.

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod ledger;
pub mod lock;
mod miss;
pub mod options;
pub mod policy;
mod refresh;
pub mod stats;
pub mod store;

pub use codec::{Codec, JsonCodec, MsgPackCodec};
pub use config::CacheConfig;
pub use error::{BoxError, CacheError, CodecError, Result, StoreError};
pub use handler::{Cache, CacheBuilder, Fetched};
pub use ledger::RefreshLedger;
pub use lock::{KeyGuard, KeyedMutex};
pub use options::CallOptions;
pub use policy::MissPolicy;
pub use stats::CacheStats;
pub use store::CacheStore;
