// Hoard - HTTP response caching with pluggable TTL stores
//
// This library bundles the hoard crates: the request/response model and
// middleware chain, the key/value stores, and the caching middleware itself.

// Re-export core functionality
pub use hoard_core::*;

pub use hoard_cache;
pub use hoard_core;
pub use hoard_log;
pub use hoard_store;

pub use hoard_cache::{CacheConfig, CacheMiddleware, CacheStats};
pub use hoard_store::{MemoryStore, Store, StoreConfig, StoreError, StoreResult};

#[cfg(feature = "file")]
pub use hoard_store::FileStore;

#[cfg(feature = "sql")]
pub use hoard_store::SqlStore;

#[cfg(feature = "redis")]
pub use hoard_store::RedisStore;

/// Everything needed to put a cache in front of a handler.
///
/// ```
/// use hoard::prelude::*;
///
/// # tokio_test::block_on(async {
/// let store = hoard::hoard_store::open(StoreConfig::memory(128)).await.unwrap();
/// let mut chain = MiddlewareChain::new();
/// chain.use_middleware(CacheMiddleware::new(CacheConfig::new(store)));
///
/// let mut rec = ResponseRecorder::new();
/// let handler = HttpResponse::ok().with_body("hello");
/// chain.apply(HttpRequest::get("/"), &mut rec, &handler).await.unwrap();
/// assert_eq!(rec.body(), b"hello");
/// # });
/// ```
pub mod prelude {
    pub use hoard_cache::{
        CacheConfig, CacheMiddleware, CacheStats, Encoder, JsonEncoder, Metrics, MsgpackEncoder,
        ResponseEnvelope,
    };
    pub use hoard_core::{
        Error, Handler, HttpRequest, HttpResponse, Middleware, MiddlewareChain, Next,
        ResponseRecorder, ResponseWriter,
    };
    pub use hoard_store::{EvictionPolicy, MemoryStore, Store, StoreConfig};

    #[cfg(feature = "file")]
    pub use hoard_store::FileStore;

    #[cfg(feature = "sql")]
    pub use hoard_store::SqlStore;

    #[cfg(feature = "redis")]
    pub use hoard_store::RedisStore;
}
