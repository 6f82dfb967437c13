//! Cache middleware configuration.

use crate::encoder::{Encoder, MsgpackEncoder};
use crate::metrics::{Metrics, NoopMetrics};
use crate::policy::{
    DEFAULT_KEY_PREFIX, DefaultKeyDeriver, DefaultResponseFilter, DefaultSkipper, KeyDeriver,
    RequestSkipper, ResponseFilter,
};
use hoard_store::{MemoryStore, Store};
use std::sync::Arc;
use std::time::Duration;

/// Everything [`CacheMiddleware`](crate::CacheMiddleware) needs, with defaults
/// for every collaborator except the store.
///
/// # Examples
///
/// ```
/// use hoard_cache::{CacheConfig, CacheStats, JsonEncoder};
/// use hoard_store::MemoryStore;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let stats = Arc::new(CacheStats::new());
/// let config = CacheConfig::new(Arc::new(MemoryStore::new(512)))
///     .with_prefix("pages")
///     .with_ttl(Duration::from_secs(300))
///     .with_encoder(Arc::new(JsonEncoder))
///     .with_metrics(stats.clone());
///
/// assert_eq!(config.prefix, "pages");
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    pub store: Arc<dyn Store>,
    pub prefix: String,
    /// Entry lifetime; zero stores without expiry
    pub ttl: Duration,
    pub skipper: Arc<dyn RequestSkipper>,
    pub filter: Arc<dyn ResponseFilter>,
    pub key: Arc<dyn KeyDeriver>,
    pub encoder: Arc<dyn Encoder>,
    pub metrics: Arc<dyn Metrics>,
}

impl CacheConfig {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: Duration::ZERO,
            skipper: Arc::new(DefaultSkipper),
            filter: Arc::new(DefaultResponseFilter::default()),
            key: Arc::new(DefaultKeyDeriver),
            encoder: Arc::new(MsgpackEncoder),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_skipper(mut self, skipper: Arc<dyn RequestSkipper>) -> Self {
        self.skipper = skipper;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn ResponseFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_key(mut self, key: Arc<dyn KeyDeriver>) -> Self {
        self.key = key;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for CacheConfig {
    /// In-memory store of 1024 entries, no expiry, MessagePack encoding.
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }
}
