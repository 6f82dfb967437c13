//! Embedded transactional file store backed by redb.

use crate::error::{StoreError, StoreResult};
use crate::sweeper::{DEFAULT_SWEEP_INTERVAL, Sweep, Sweeper};
use crate::traits::{Store, expiry_millis, now_millis};
use async_trait::async_trait;
use hoard_log::{debug, info};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cache");

/// Physical form of one cached entry.
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    #[serde(with = "serde_bytes")]
    value: Vec<u8>,
    /// Epoch milliseconds; `None` never expires
    expires_at: Option<i64>,
}

impl FileRecord {
    fn decode(bytes: &[u8]) -> StoreResult<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn encode(&self) -> StoreResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| StoreError::Encode(e.to_string()))
    }

    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }
}

fn file_err<E: Into<redb::Error>>(e: E) -> StoreError {
    StoreError::File(e.into())
}

struct FileInner {
    path: PathBuf,
    db: RwLock<Option<Arc<Database>>>,
}

impl FileInner {
    fn database(&self) -> StoreResult<Arc<Database>> {
        self.db.read().clone().ok_or(StoreError::Closed)
    }

    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = self.database()?;
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Other(format!("file store task failed: {e}")))?
    }
}

#[async_trait]
impl Sweep for FileInner {
    async fn sweep(&self) -> StoreResult<usize> {
        self.blocking(|db| {
            let now = now_millis();
            let txn = db.begin_write().map_err(file_err)?;
            let removed = {
                let mut table = txn.open_table(TABLE).map_err(file_err)?;
                let mut doomed = Vec::new();
                for item in table.iter().map_err(file_err)? {
                    let (key, value) = item.map_err(file_err)?;
                    let expired = match FileRecord::decode(value.value()) {
                        Ok(record) => record.is_expired(now),
                        Err(_) => true,
                    };
                    if expired {
                        doomed.push(key.value().to_string());
                    }
                }
                for key in &doomed {
                    table.remove(key.as_str()).map_err(file_err)?;
                }
                doomed.len()
            };
            txn.commit().map_err(file_err)?;
            Ok(removed)
        })
        .await
    }
}

/// Store persisting entries in a single redb database file.
///
/// Reads run in read-only transactions and never block writers. Expired
/// records stay on disk until the background sweep deletes them, so disk
/// usage can trail the live set by up to one sweep period.
pub struct FileStore {
    inner: Arc<FileInner>,
    sweeper: Sweeper,
}

impl FileStore {
    /// Open (or create) the database at `path` with the default sweep period.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_interval(path, DEFAULT_SWEEP_INTERVAL).await
    }

    pub async fn open_with_interval(
        path: impl AsRef<Path>,
        sweep_interval: Duration,
    ) -> StoreResult<Self> {
        if sweep_interval.is_zero() {
            return Err(StoreError::Config(
                "sweep interval must be greater than zero".to_string(),
            ));
        }

        let path = path.as_ref().to_path_buf();
        let open_path = path.clone();
        let db = tokio::task::spawn_blocking(move || -> StoreResult<Database> {
            let db = Database::create(&open_path).map_err(file_err)?;
            let txn = db.begin_write().map_err(file_err)?;
            txn.open_table(TABLE).map_err(file_err)?;
            txn.commit().map_err(file_err)?;
            Ok(db)
        })
        .await
        .map_err(|e| StoreError::Other(format!("file store task failed: {e}")))??;

        info!(target: "hoard::store::file", "Opened file store at {}", path.display());

        let inner = Arc::new(FileInner {
            path,
            db: RwLock::new(Some(Arc::new(db))),
        });
        let sweeper = Sweeper::start("file store", sweep_interval, inner.clone());

        Ok(Self { inner, sweeper })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Delete every expired record now. Returns how many were removed.
    pub async fn sweep(&self) -> StoreResult<usize> {
        self.inner.sweep().await
    }

    /// Number of records on disk, expired or not.
    pub async fn record_count(&self) -> StoreResult<u64> {
        self.inner
            .blocking(|db| {
                let txn = db.begin_read().map_err(file_err)?;
                let table = txn.open_table(TABLE).map_err(file_err)?;
                table.len().map_err(file_err)
            })
            .await
    }

    /// Write raw bytes under `key`, bypassing the record encoding.
    #[cfg(test)]
    pub(crate) async fn put_raw(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        let key = key.to_string();
        self.inner
            .blocking(move |db| {
                let txn = db.begin_write().map_err(file_err)?;
                {
                    let mut table = txn.open_table(TABLE).map_err(file_err)?;
                    table.insert(key.as_str(), bytes.as_slice()).map_err(file_err)?;
                }
                txn.commit().map_err(file_err)
            })
            .await
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.inner
            .blocking(move |db| {
                let txn = db.begin_read().map_err(file_err)?;
                let table = txn.open_table(TABLE).map_err(file_err)?;
                let Some(guard) = table.get(key.as_str()).map_err(file_err)? else {
                    return Ok(None);
                };
                let record = FileRecord::decode(guard.value())?;
                if record.is_expired(now_millis()) {
                    return Ok(None);
                }
                Ok(Some(record.value))
            })
            .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let record = FileRecord {
            value,
            expires_at: expiry_millis(now_millis(), ttl),
        };
        let bytes = record.encode()?;
        let key = key.to_string();

        self.inner
            .blocking(move |db| {
                let txn = db.begin_write().map_err(file_err)?;
                {
                    let mut table = txn.open_table(TABLE).map_err(file_err)?;
                    table.insert(key.as_str(), bytes.as_slice()).map_err(file_err)?;
                }
                txn.commit().map_err(file_err)
            })
            .await
    }

    async fn close(&self) -> StoreResult<()> {
        self.sweeper.stop().await;
        if self.inner.db.write().take().is_some() {
            debug!(target: "hoard::store::file", "Closed file store at {}", self.inner.path.display());
        }
        Ok(())
    }
}
