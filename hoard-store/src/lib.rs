//! TTL-aware key/value stores for the hoard response cache.
//!
//! Every backend implements the [`Store`] contract: `get` returns the live
//! value or `None`, `set` replaces an entry under a TTL, and a zero TTL
//! stores without expiry. Backends are used as `Arc<dyn Store>`.
//!
//! # Features
//!
//! - Memory backend - moka LRU / TinyLFU or an adaptive replacement cache (always on)
//! - `file` - embedded redb file with a periodic expiry sweep (default)
//! - `sql` - SQLite, PostgreSQL or MySQL through sqlx (default)
//! - `redis` - Redis with native expiry (default)
//!
//! # Examples
//!
//! ```
//! use hoard_store::*;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let store = open(StoreConfig::memory(1024)).await.unwrap();
//!
//! store.set("key", b"value".to_vec(), Duration::ZERO).await.unwrap();
//! assert_eq!(store.get("key").await.unwrap(), Some(b"value".to_vec()));
//! # });
//! ```

mod adaptive;
pub mod config;
pub mod error;
pub mod memory;
pub mod sweeper;
pub mod traits;

#[cfg(feature = "file")]
pub mod file_store;

#[cfg(feature = "sql")]
pub mod sql_store;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use config::{Dialect, StoreBackend, StoreConfig, validate_table_name};
pub use error::{StoreError, StoreResult};
pub use memory::{EvictionPolicy, MemoryStore};
pub use sweeper::{Sweep, Sweeper};
pub use traits::Store;

#[cfg(feature = "file")]
pub use file_store::FileStore;

#[cfg(feature = "sql")]
pub use sql_store::{SqlStatements, SqlStore, SqlStoreOptions, pool_options};

#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use std::sync::Arc;

/// Build the store described by `config`.
///
/// Configuration problems (unknown dialect, bad table name, a backend whose
/// feature is disabled) surface here as [`StoreError::Config`].
pub async fn open(config: StoreConfig) -> StoreResult<Arc<dyn Store>> {
    match &config.backend {
        StoreBackend::Memory { capacity } => {
            Ok(Arc::new(MemoryStore::with_policy(*capacity, config.eviction)))
        }

        #[cfg(feature = "file")]
        StoreBackend::File { path } => {
            Ok(Arc::new(FileStore::open_with_interval(path, config.sweep_interval).await?))
        }

        #[cfg(feature = "sql")]
        StoreBackend::Sql { url } => {
            let dialect = config.dialect()?;
            validate_table_name(&config.table)?;
            sqlx::any::install_default_drivers();
            let pool = sql_store::pool_options(url, config.max_connections)
                .connect(url)
                .await?;
            let options = SqlStoreOptions::new(dialect)
                .with_table(config.table.clone())
                .with_sweep_interval(config.sweep_interval);
            Ok(Arc::new(SqlStore::new(pool, options).await?))
        }

        #[cfg(feature = "redis")]
        StoreBackend::Redis { url } => Ok(Arc::new(RedisStore::from_config(url, &config).await?)),

        #[allow(unreachable_patterns)]
        other => Err(StoreError::Config(format!(
            "store backend {other:?} is not enabled in this build"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_memory() {
        let store = open(StoreConfig::memory(4).with_eviction(EvictionPolicy::Adaptive))
            .await
            .unwrap();
        store.set("a", b"1".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
    }

    #[cfg(feature = "sql")]
    #[tokio::test]
    async fn test_open_sql_rejects_bad_config_before_connecting() {
        let result = open(StoreConfig::sql("oracle://localhost/db")).await;
        assert!(matches!(result, Err(StoreError::Config(_))));

        let result = open(StoreConfig::sql("postgres://localhost:1/db").with_table("bad name")).await;
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
