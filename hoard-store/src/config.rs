//! Store configuration types.

use crate::error::{StoreError, StoreResult};
use crate::memory::EvictionPolicy;
use crate::sweeper::DEFAULT_SWEEP_INTERVAL;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default entry count for the in-memory backend.
pub const DEFAULT_MEMORY_CAPACITY: u64 = 1024;

/// Default table name for the relational backend.
pub const DEFAULT_TABLE_NAME: &str = "echo_cache";

/// Default pool size for the relational backend.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// SQL dialect spoken by the relational backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    /// Infer the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> StoreResult<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| StoreError::Config(format!("no scheme in database URL: {url}")))?;
        scheme.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    /// Column type for cache keys.
    pub fn text_type(&self) -> &'static str {
        match self {
            Dialect::MySql => "VARCHAR(255)",
            _ => "TEXT",
        }
    }

    /// Column type for cached values.
    pub fn bytes_type(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "BLOB",
            Dialect::Postgres => "BYTEA",
            Dialect::MySql => "LONGBLOB",
        }
    }

    /// Column type for expiry timestamps.
    pub fn bigint_type(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER",
            _ => "BIGINT",
        }
    }

    /// Bind placeholder for the `n`th (1-based) parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            _ => "?".to_string(),
        }
    }

    /// Clause turning an INSERT into an upsert on `cache_key`.
    pub fn upsert_clause(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "ON DUPLICATE KEY UPDATE value = VALUES(value), expired_at = VALUES(expired_at)"
            }
            _ => {
                "ON CONFLICT (cache_key) DO UPDATE SET value = excluded.value, expired_at = excluded.expired_at"
            }
        }
    }
}

impl FromStr for Dialect {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            other => Err(StoreError::Config(format!("unknown SQL dialect: {other}"))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `name` is a plain SQL identifier safe to splice into DDL.
pub fn validate_table_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::Config("table name cannot be empty".to_string()));
    }
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') || name.len() > 63 {
        return Err(StoreError::Config(format!(
            "invalid table name: {name:?}"
        )));
    }
    Ok(())
}

/// Backend selected by a [`StoreConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory { capacity: u64 },
    File { path: PathBuf },
    Sql { url: String },
    Redis { url: String },
}

/// Store configuration.
///
/// # Examples
///
/// ```
/// use hoard_store::{Dialect, StoreConfig};
/// use std::time::Duration;
///
/// let config = StoreConfig::sql("sqlite::memory:")
///     .with_table("responses")
///     .with_sweep_interval(Duration::from_secs(30));
/// assert_eq!(config.dialect().unwrap(), Dialect::Sqlite);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend type and its location
    pub backend: StoreBackend,

    /// Eviction policy for the in-memory backend
    pub eviction: EvictionPolicy,

    /// Period between expiry sweeps for file and SQL backends
    pub sweep_interval: Duration,

    /// Table name for the SQL backend
    pub table: String,

    /// Explicit SQL dialect; inferred from the URL when unset
    pub dialect: Option<Dialect>,

    /// Maximum pool size for the SQL backend
    pub max_connections: u32,

    /// Key prefix for the Redis backend
    pub key_prefix: Option<String>,
}

impl StoreConfig {
    fn with_backend(backend: StoreBackend) -> Self {
        Self {
            backend,
            eviction: EvictionPolicy::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            table: DEFAULT_TABLE_NAME.to_string(),
            dialect: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            key_prefix: None,
        }
    }

    /// In-memory store holding at most `capacity` entries.
    pub fn memory(capacity: u64) -> Self {
        Self::with_backend(StoreBackend::Memory { capacity })
    }

    /// Embedded file store at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(StoreBackend::File { path: path.into() })
    }

    /// Relational store reached through `url`
    /// (e.g. `sqlite://cache.db`, `postgres://localhost/app`).
    pub fn sql(url: impl Into<String>) -> Self {
        Self::with_backend(StoreBackend::Sql { url: url.into() })
    }

    /// Redis store reached through `url` (e.g. `redis://localhost:6379`).
    pub fn redis(url: impl Into<String>) -> Self {
        Self::with_backend(StoreBackend::Redis { url: url.into() })
    }

    pub fn with_eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Effective SQL dialect: the explicit one, or the URL scheme's.
    pub fn dialect(&self) -> StoreResult<Dialect> {
        match (&self.dialect, &self.backend) {
            (Some(dialect), _) => Ok(*dialect),
            (None, StoreBackend::Sql { url }) => Dialect::from_url(url),
            (None, _) => Err(StoreError::Config(
                "SQL dialect requested for a non-SQL store".to_string(),
            )),
        }
    }
}
