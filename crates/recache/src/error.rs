use thiserror::Error;

/// Boxed error type accepted from generators and custom codecs.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key is absent from the store. Returned by [`Cache::get`] so that
    /// callers (and the read-through path itself) can tell a miss apart from
    /// a transport failure.
    ///
    /// [`Cache::get`]: crate::Cache::get
    #[error("cache miss: {key}")]
    Miss { key: String },

    /// The key was absent and the fail-fast miss policy was in effect.
    #[error("cache miss with fail-fast policy: {key}")]
    FailFast { key: String },

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("encode: {0}")]
    Encode(#[source] CodecError),

    #[error("decode: {0}")]
    Decode(#[source] CodecError),

    #[error("generator: {0}")]
    Generator(#[source] BoxError),
}

impl CacheError {
    pub fn miss(key: impl Into<String>) -> Self {
        Self::Miss { key: key.into() }
    }

    pub fn fail_fast(key: impl Into<String>) -> Self {
        Self::FailFast { key: key.into() }
    }

    pub fn generator(err: impl Into<BoxError>) -> Self {
        Self::Generator(err.into())
    }

    /// True when the error is the distinguished "key absent" signal.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }

    /// True when the error is the fail-fast policy sentinel.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Self::FailFast { .. })
    }
}

/// Errors reported by a [`CacheStore`] backend.
///
/// [`CacheStore`]: crate::CacheStore
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (pool exhausted, connect refused).
    #[error("connection: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("command: {0}")]
    Command(String),
}

impl StoreError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }
}

/// Serialization failure from a [`Codec`](crate::Codec).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CodecError(BoxError);

impl CodecError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Convenience result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
