//! Bounded in-process store.

use crate::adaptive::AdaptiveCache;
use crate::config::DEFAULT_MEMORY_CAPACITY;
use crate::error::{StoreError, StoreResult};
use crate::traits::Store;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How the in-memory store picks entries to evict once full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least recently used
    Recency,
    /// TinyLFU admission with LRU eviction
    #[default]
    Frequency,
    /// Adaptive replacement (ARC)
    Adaptive,
}

/// Longer TTLs are kept without a deadline; moka rejects spans past 1000 years.
const MAX_EXPIRING_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Clone)]
struct MemoryEntry {
    value: Arc<[u8]>,
    ttl: Option<Duration>,
}

struct EntryExpiry;

impl Expiry<String, MemoryEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

enum Backend {
    Moka(Cache<String, MemoryEntry>),
    Adaptive(Mutex<AdaptiveCache>),
}

/// In-memory store with a fixed entry bound.
///
/// Never performs I/O and never fails at runtime, other than with
/// [`StoreError::Closed`] after [`Store::close`].
///
/// # Examples
///
/// ```
/// use hoard_store::{EvictionPolicy, MemoryStore, Store};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::with_policy(128, EvictionPolicy::Recency);
/// store.set("key", b"value".to_vec(), Duration::from_secs(60)).await.unwrap();
/// assert_eq!(store.get("key").await.unwrap(), Some(b"value".to_vec()));
/// # });
/// ```
pub struct MemoryStore {
    backend: Backend,
    capacity: u64,
    policy: EvictionPolicy,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryStore {
    /// Create a store holding at most `capacity` entries, using TinyLFU.
    pub fn new(capacity: u64) -> Self {
        Self::with_policy(capacity, EvictionPolicy::default())
    }

    pub fn with_policy(capacity: u64, policy: EvictionPolicy) -> Self {
        let backend = match policy {
            EvictionPolicy::Recency => {
                Backend::Moka(Self::moka(capacity, moka::policy::EvictionPolicy::lru()))
            }
            EvictionPolicy::Frequency => {
                Backend::Moka(Self::moka(capacity, moka::policy::EvictionPolicy::tiny_lfu()))
            }
            EvictionPolicy::Adaptive => {
                let capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
                Backend::Adaptive(Mutex::new(AdaptiveCache::new(capacity)))
            }
        };

        Self {
            backend,
            capacity,
            policy,
            closed: AtomicBool::new(false),
        }
    }

    fn moka(capacity: u64, policy: moka::policy::EvictionPolicy) -> Cache<String, MemoryEntry> {
        Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(policy)
            .expire_after(EntryExpiry)
            .build()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Number of resident entries.
    ///
    /// For the LRU and TinyLFU policies this count lags behind recent writes
    /// until [`MemoryStore::run_pending_tasks`] runs.
    pub fn entry_count(&self) -> u64 {
        match &self.backend {
            Backend::Moka(cache) => cache.entry_count(),
            Backend::Adaptive(cache) => cache.lock().len() as u64,
        }
    }

    /// Apply pending evictions and expirations.
    pub async fn run_pending_tasks(&self) {
        if let Backend::Moka(cache) = &self.backend {
            cache.run_pending_tasks().await;
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let value = match &self.backend {
            Backend::Moka(cache) => cache.get(key).await.map(|entry| entry.value),
            Backend::Adaptive(cache) => cache.lock().get(key),
        };
        Ok(value.map(|value| value.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.ensure_open()?;
        match &self.backend {
            Backend::Moka(cache) => {
                let entry = MemoryEntry {
                    value: value.into(),
                    ttl: (!ttl.is_zero() && ttl <= MAX_EXPIRING_TTL).then_some(ttl),
                };
                cache.insert(key.to_string(), entry).await;
            }
            Backend::Adaptive(cache) => cache.lock().set(key, value, ttl),
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match &self.backend {
            Backend::Moka(cache) => {
                cache.invalidate_all();
                cache.run_pending_tasks().await;
            }
            Backend::Adaptive(cache) => cache.lock().clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryStore::default();
        assert_eq!(store.capacity(), 1024);
        assert_eq!(store.policy(), EvictionPolicy::Frequency);
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_used() {
        let store = MemoryStore::with_policy(3, EvictionPolicy::Recency);
        for key in ["a", "b", "c"] {
            store.set(key, key.as_bytes().to_vec(), Duration::ZERO).await.unwrap();
        }
        store.run_pending_tasks().await;
        assert!(store.get("a").await.unwrap().is_some());
        store.run_pending_tasks().await;

        store.set("d", b"d".to_vec(), Duration::ZERO).await.unwrap();
        store.run_pending_tasks().await;

        assert_eq!(store.get("b").await.unwrap(), None);
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("d").await.unwrap().is_some());
        assert_eq!(store.entry_count(), 3);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_accepted_by_every_policy() {
        for policy in [
            EvictionPolicy::Recency,
            EvictionPolicy::Frequency,
            EvictionPolicy::Adaptive,
        ] {
            let store = MemoryStore::with_policy(8, policy);
            store.set("k", b"v".to_vec(), Duration::MAX).await.unwrap();
            assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()), "{policy:?}");
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        for policy in [EvictionPolicy::Frequency, EvictionPolicy::Adaptive] {
            let store = MemoryStore::with_policy(8, policy);
            store.set("k", b"v".to_vec(), Duration::ZERO).await.unwrap();
            store.close().await.unwrap();
            store.close().await.unwrap();
            assert!(matches!(store.get("k").await, Err(StoreError::Closed)));
            assert!(matches!(
                store.set("k", b"v".to_vec(), Duration::ZERO).await,
                Err(StoreError::Closed)
            ));
        }
    }
}
