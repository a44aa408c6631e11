/// Behavior applied when a key is absent from the store.
///
/// Every policy shares the same hit path; they differ in how much latency,
/// duplicated work, and staleness they accept on a miss. The default trades
/// latency for strict single-flight generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissPolicy {
    /// Acquire the per-key lock, re-check the store, generate, write, then
    /// return the generated value. Concurrent callers for the same key wait
    /// and observe the first caller's write.
    #[default]
    SyncWriteThenReturn,

    /// Generate and return immediately; persist from a background task that
    /// double-checks the key is still absent before writing.
    ReturnThenAsyncWrite,

    /// Serve the stale companion copy if one exists and refresh both keys in
    /// the background; otherwise behave like [`Self::SyncWriteThenReturn`].
    StaleWhileRevalidate,

    /// Return [`CacheError::FailFast`](crate::CacheError::FailFast) without
    /// invoking the generator.
    FailFast,

    /// Like [`Self::SyncWriteThenReturn`] on the miss itself, plus a delayed
    /// background refresh scheduled to land before the TTL runs out. On hits,
    /// refreshes once the remaining TTL fraction drops to the threshold.
    RefreshAhead,

    /// Wait for the per-key lock up to the cooperative timeout. Callers that
    /// time out generate directly and skip the cache write entirely.
    CooperativeRefresh,

    /// Generate, tolerating failure: a failed generator yields the default
    /// value with no error, and a failed cache write is ignored.
    BestEffort,

    /// Like [`Self::SyncWriteThenReturn`], plus an age stamp that lets hits
    /// refresh early with probability `(age / ttl) * beta`, spreading refresh
    /// load instead of synchronizing it at expiry.
    ProbabilisticRefresh,
}
