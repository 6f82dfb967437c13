//! Relational store over SQLite, PostgreSQL or MySQL.

use crate::config::{DEFAULT_MAX_CONNECTIONS, DEFAULT_TABLE_NAME, Dialect, validate_table_name};
use crate::error::{StoreError, StoreResult};
use crate::sweeper::{DEFAULT_SWEEP_INTERVAL, Sweep, Sweeper};
use crate::traits::{Store, expiry_millis, now_millis};
use async_trait::async_trait;
use hoard_log::{debug, info};
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use std::sync::Arc;
use std::time::Duration;

/// Statements built once per store and reused for every call.
#[derive(Debug, Clone)]
pub struct SqlStatements {
    pub create_table: String,
    pub select: String,
    pub upsert: String,
    pub delete_expired: String,
}

impl SqlStatements {
    pub fn new(dialect: Dialect, table: &str) -> StoreResult<Self> {
        validate_table_name(table)?;

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             cache_key {} PRIMARY KEY, \
             value {} NOT NULL, \
             expired_at {} NOT NULL)",
            dialect.text_type(),
            dialect.bytes_type(),
            dialect.bigint_type(),
        );
        let select = format!(
            "SELECT value FROM {table} WHERE cache_key = {} AND expired_at > {}",
            dialect.placeholder(1),
            dialect.placeholder(2),
        );
        let upsert = format!(
            "INSERT INTO {table} (cache_key, value, expired_at) VALUES ({}, {}, {}) {}",
            dialect.placeholder(1),
            dialect.placeholder(2),
            dialect.placeholder(3),
            dialect.upsert_clause(),
        );
        let delete_expired = format!(
            "DELETE FROM {table} WHERE expired_at <= {}",
            dialect.placeholder(1),
        );

        Ok(Self {
            create_table,
            select,
            upsert,
            delete_expired,
        })
    }
}

/// Whether `url` names a SQLite database that lives only in memory.
fn is_in_memory_sqlite(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return false;
    };
    let rest = rest.trim_start_matches('/');
    rest.starts_with(":memory:") || rest.contains("mode=memory")
}

/// Pool options for `url` with at most `max_connections` connections.
///
/// Every connection to an in-memory SQLite URL opens its own empty database,
/// so such pools are pinned to one connection that is never recycled.
pub fn pool_options(url: &str, max_connections: u32) -> AnyPoolOptions {
    if is_in_memory_sqlite(url) {
        AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        AnyPoolOptions::new().max_connections(max_connections)
    }
}

/// Options for [`SqlStore::new`].
#[derive(Debug, Clone)]
pub struct SqlStoreOptions {
    pub table: String,
    pub dialect: Dialect,
    pub sweep_interval: Duration,
}

impl SqlStoreOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            table: DEFAULT_TABLE_NAME.to_string(),
            dialect,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

struct SqlInner {
    pool: AnyPool,
    statements: SqlStatements,
    sweep_lock: tokio::sync::Mutex<()>,
}

impl SqlInner {
    fn pool(&self) -> StoreResult<&AnyPool> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(&self.pool)
    }
}

#[async_trait]
impl Sweep for SqlInner {
    async fn sweep(&self) -> StoreResult<usize> {
        let _guard = self.sweep_lock.lock().await;
        let result = sqlx::query(&self.statements.delete_expired)
            .bind(now_millis())
            .execute(self.pool()?)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}

/// Store keeping entries in one SQL table.
///
/// Schema: `cache_key` primary key, `value` bytes, `expired_at` epoch
/// milliseconds. Entries without expiry store `i64::MAX`. A hit requires
/// `expired_at` strictly after now.
pub struct SqlStore {
    inner: Arc<SqlInner>,
    sweeper: Sweeper,
    dialect: Dialect,
    table: String,
}

impl SqlStore {
    /// Connect to `url` and open the store. The dialect comes from the URL.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let dialect = Dialect::from_url(url)?;
        sqlx::any::install_default_drivers();
        let pool = pool_options(url, DEFAULT_MAX_CONNECTIONS).connect(url).await?;
        Self::new(pool, SqlStoreOptions::new(dialect)).await
    }

    /// Open the store on an existing pool, creating the table if needed.
    ///
    /// Invalid table names and a zero sweep interval are rejected with
    /// [`StoreError::Config`] before touching the database.
    pub async fn new(pool: AnyPool, options: SqlStoreOptions) -> StoreResult<Self> {
        if options.sweep_interval.is_zero() {
            return Err(StoreError::Config(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        let statements = SqlStatements::new(options.dialect, &options.table)?;

        sqlx::query(&statements.create_table).execute(&pool).await?;
        info!(
            target: "hoard::store::sql",
            "Opened {} store on table {}", options.dialect, options.table
        );

        let inner = Arc::new(SqlInner {
            pool,
            statements,
            sweep_lock: tokio::sync::Mutex::new(()),
        });
        let sweeper = Sweeper::start("sql store", options.sweep_interval, inner.clone());

        Ok(Self {
            inner,
            sweeper,
            dialect: options.dialect,
            table: options.table,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn statements(&self) -> &SqlStatements {
        &self.inner.statements
    }

    /// Delete expired rows now. Never overlaps with the background sweep.
    pub async fn sweep(&self) -> StoreResult<usize> {
        self.inner.sweep().await
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let row = sqlx::query(&self.inner.statements.select)
            .bind(key)
            .bind(now_millis())
            .fetch_optional(self.inner.pool()?)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<Vec<u8>, _>(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let expired_at = expiry_millis(now_millis(), ttl).unwrap_or(i64::MAX);
        sqlx::query(&self.inner.statements.upsert)
            .bind(key)
            .bind(value)
            .bind(expired_at)
            .execute(self.inner.pool()?)
            .await?;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.sweeper.stop().await;
        if !self.inner.pool.is_closed() {
            self.inner.pool.close().await;
            debug!(target: "hoard::store::sql", "Closed {} store", self.dialect);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_statements() {
        let stmts = SqlStatements::new(Dialect::Sqlite, "echo_cache").unwrap();
        assert_eq!(
            stmts.select,
            "SELECT value FROM echo_cache WHERE cache_key = ? AND expired_at > ?"
        );
        assert!(stmts.upsert.contains("VALUES (?, ?, ?) ON CONFLICT (cache_key) DO UPDATE"));
        assert_eq!(stmts.delete_expired, "DELETE FROM echo_cache WHERE expired_at <= ?");
        assert!(stmts.create_table.contains("value BLOB NOT NULL"));
        assert!(stmts.create_table.contains("expired_at INTEGER NOT NULL"));
    }

    #[test]
    fn test_postgres_statements() {
        let stmts = SqlStatements::new(Dialect::Postgres, "responses").unwrap();
        assert!(stmts.select.ends_with("cache_key = $1 AND expired_at > $2"));
        assert!(stmts.upsert.contains("VALUES ($1, $2, $3)"));
        assert!(stmts.create_table.contains("value BYTEA"));
        assert!(stmts.create_table.contains("expired_at BIGINT"));
    }

    #[test]
    fn test_mysql_statements() {
        let stmts = SqlStatements::new(Dialect::MySql, "echo_cache").unwrap();
        assert!(stmts.upsert.contains("ON DUPLICATE KEY UPDATE value = VALUES(value)"));
        assert!(stmts.create_table.contains("cache_key VARCHAR(255) PRIMARY KEY"));
    }

    #[test]
    fn test_in_memory_sqlite_detection() {
        assert!(is_in_memory_sqlite("sqlite::memory:"));
        assert!(is_in_memory_sqlite("sqlite://:memory:"));
        assert!(is_in_memory_sqlite("sqlite:file:cache?mode=memory&cache=shared"));
        assert!(!is_in_memory_sqlite("sqlite://cache.db?mode=rwc"));
        assert!(!is_in_memory_sqlite("postgres://localhost/memory"));
    }

    #[test]
    fn test_in_memory_pool_is_pinned_to_one_connection() {
        let options = pool_options("sqlite::memory:", 10);
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);

        let options = pool_options("postgres://localhost/app", 10);
        assert_eq!(options.get_max_connections(), 10);
    }

    #[test]
    fn test_invalid_table_is_rejected() {
        assert!(SqlStatements::new(Dialect::Sqlite, "").unwrap_err().is_config());
        assert!(
            SqlStatements::new(Dialect::Sqlite, "x; DROP TABLE y")
                .unwrap_err()
                .is_config()
        );
    }
}
