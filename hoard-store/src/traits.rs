//! Store trait definition.

use crate::error::StoreResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// TTL-aware key/value store shared by all cache backends.
///
/// Values are opaque bytes. Implementations must be safe for concurrent
/// `get`/`set` on the same or distinct keys, and must never return an
/// entry after its expiry instant.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the live value for a key.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(value))` for a live entry, `Ok(None)` when the key
    /// was never set or has expired, or an error if the backend fails.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Set a value, replacing any existing entry for the key.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `value` - The bytes to store
    /// * `ttl` - Time-to-live; `Duration::ZERO` stores without expiry
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Release the store's resources.
    ///
    /// Idempotent. After the first call, `get` and `set` fail with
    /// [`StoreError::Closed`](crate::StoreError::Closed).
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }
}

/// Absolute expiry in epoch milliseconds for a TTL starting now.
///
/// `Duration::ZERO` maps to `None`. Sub-millisecond TTLs round up to 1 ms.
pub(crate) fn expiry_millis(now_ms: i64, ttl: Duration) -> Option<i64> {
    if ttl.is_zero() {
        return None;
    }
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);
    Some(now_ms.saturating_add(ttl_ms))
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_millis() {
        assert_eq!(expiry_millis(1_000, Duration::ZERO), None);
        assert_eq!(expiry_millis(1_000, Duration::from_millis(250)), Some(1_250));
        assert_eq!(expiry_millis(1_000, Duration::from_micros(10)), Some(1_001));
        assert_eq!(expiry_millis(i64::MAX - 1, Duration::from_secs(60)), Some(i64::MAX));
    }
}
