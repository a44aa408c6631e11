//! Redis [`CacheStore`] backend over a `deadpool-redis` connection pool.
//!
//! TTLs are written with millisecond precision (`SET ... PX`) and read back
//! through `PTTL`, so sub-second expirations survive the round trip. The
//! `redis` crate is used through deadpool's re-export, which keeps the pool
//! and the command API on the same version.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use recache::{CacheStore, StoreError};

/// Redis-backed byte store.
///
/// Cloning shares the pool. All operations borrow a pooled connection for
/// the duration of a single command.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Wrap an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from a `redis://` URL.
    pub fn from_url(url: impl Into<String>) -> Result<Self, StoreError> {
        let config = Config::from_url(url);
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| StoreError::connection(err.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Connection, StoreError> {
        self.pool.get().await.map_err(|err| {
            tracing::warn!(error = %err, "failed to get Redis connection");
            StoreError::connection(err.to_string())
        })
    }

    fn command_error(key: &str, op: &'static str, err: impl std::fmt::Display) -> StoreError {
        tracing::warn!(key = %key, error = %err, "Redis {op} error");
        StoreError::command(err.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|err| Self::command_error(key, "GET", err))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        // PX keeps sub-second TTLs; SET EX would truncate to whole seconds.
        let millis = ttl.as_millis().max(1) as u64;
        let _: () = deadpool_redis::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(|err| Self::command_error(key, "SET", err))?;
        tracing::debug!(key = %key, ttl_ms = %millis, "redis set");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        conn.exists::<_, bool>(key)
            .await
            .map_err(|err| Self::command_error(key, "EXISTS", err))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn().await?;
        // PTTL: -2 = missing, -1 = no expiry.
        let millis: i64 = deadpool_redis::redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|err| Self::command_error(key, "PTTL", err))?;
        if millis > 0 {
            Ok(Some(Duration::from_millis(millis as u64)))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|err| Self::command_error(key, "DEL", err))?;
        Ok(())
    }
}
