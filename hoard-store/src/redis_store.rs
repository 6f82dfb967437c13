//! Redis store implementation.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::Store;
use async_trait::async_trait;
use hoard_log::info;
use parking_lot::RwLock;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;

/// Store delegating expiry to Redis.
///
/// Entries with a TTL are written with `SET key value PX ms`; a zero TTL
/// writes a plain `SET` without expiry.
pub struct RedisStore {
    connection: RwLock<Option<ConnectionManager>>,
    key_prefix: Option<String>,
}

impl RedisStore {
    /// Create a new Redis store.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hoard_store::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), StoreError> {
    ///     let store = RedisStore::connect("redis://localhost:6379").await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> StoreResult<Self> {
        Self::with_prefix(url, None).await
    }

    /// Create a store whose keys are written as `prefix:key`.
    pub async fn with_prefix(url: &str, key_prefix: Option<String>) -> StoreResult<Self> {
        let client = Client::open(url)
            .map_err(|e| StoreError::Config(format!("invalid Redis URL {url}: {e}")))?;
        let connection = ConnectionManager::new(client).await?;

        info!(target: "hoard::store::redis", "Connected Redis store");
        Ok(Self {
            connection: RwLock::new(Some(connection)),
            key_prefix,
        })
    }

    pub(crate) async fn from_config(url: &str, config: &StoreConfig) -> StoreResult<Self> {
        Self::with_prefix(url, config.key_prefix.clone()).await
    }

    fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    fn connection(&self) -> StoreResult<ConnectionManager> {
        self.connection.read().clone().ok_or(StoreError::Closed)
    }
}

/// Millisecond expiry for `PX`, rounding sub-millisecond TTLs up to 1 ms.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = self.build_key(key);
        let mut conn = self.connection()?;

        let value: Option<Vec<u8>> = conn.get(&key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let key = self.build_key(key);
        let mut conn = self.connection()?;

        if ttl.is_zero() {
            let _: () = redis::cmd("SET")
                .arg(&key)
                .arg(value)
                .query_async(&mut conn)
                .await?;
        } else {
            let _: () = redis::cmd("SET")
                .arg(&key)
                .arg(value)
                .arg("PX")
                .arg(px_millis(ttl))
                .query_async(&mut conn)
                .await?;
        }

        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.connection.write().take();
        Ok(())
    }
}
