//! HTTP response caching for hoard.
//!
//! [`CacheMiddleware`] sits in a [`hoard_core::MiddlewareChain`] and keeps
//! whole responses (status, headers and body) in any [`hoard_store::Store`].
//! A miss runs the handler behind a [`CaptureWriter`], which forwards every
//! byte to the client while keeping a copy; an eligible response is then
//! encoded and stored. A hit replays the stored response without touching
//! the handler.
//!
//! # Examples
//!
//! ```
//! use hoard_cache::{CacheConfig, CacheMiddleware, CacheStats};
//! use hoard_core::{HttpRequest, HttpResponse, MiddlewareChain, ResponseRecorder};
//! use hoard_store::MemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let stats = Arc::new(CacheStats::new());
//! let config = CacheConfig::new(Arc::new(MemoryStore::new(1024)))
//!     .with_ttl(Duration::from_secs(60))
//!     .with_metrics(stats.clone());
//!
//! let mut chain = MiddlewareChain::new();
//! chain.use_middleware(CacheMiddleware::new(config));
//!
//! let handler = HttpResponse::ok().with_body("expensive");
//! for _ in 0..2 {
//!     let mut rec = ResponseRecorder::new();
//!     chain.apply(HttpRequest::get("/report"), &mut rec, &handler).await.unwrap();
//!     assert_eq!(rec.body(), b"expensive");
//! }
//!
//! let snapshot = stats.snapshot();
//! assert_eq!((snapshot.misses, snapshot.hits), (1, 1));
//! # });
//! ```

pub mod capture;
pub mod config;
pub mod encoder;
pub mod envelope;
pub mod metrics;
pub mod middleware;
pub mod policy;

pub use capture::CaptureWriter;
pub use config::CacheConfig;
pub use encoder::{DecodeError, EncodeError, Encoder, JsonEncoder, MsgpackEncoder};
pub use envelope::ResponseEnvelope;
pub use metrics::{CacheStats, Metrics, NoopMetrics, StatsSnapshot};
pub use middleware::CacheMiddleware;
pub use policy::{
    DEFAULT_KEY_PREFIX, DEFAULT_MAX_BODY_SIZE, DefaultKeyDeriver, DefaultResponseFilter,
    DefaultSkipper, KeyDeriver, RequestSkipper, ResponseFilter,
};
