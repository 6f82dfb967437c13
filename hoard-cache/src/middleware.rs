//! Response caching middleware.

use crate::capture::CaptureWriter;
use crate::config::CacheConfig;
use crate::envelope::ResponseEnvelope;
use async_trait::async_trait;
use hoard_core::{Error, HttpRequest, Middleware, Next, ResponseWriter};
use hoard_log::{debug, trace, warn};
use std::time::Instant;

/// Serves cached responses and stores eligible fresh ones.
///
/// Per request: skipped requests pass straight through. Otherwise the key
/// is looked up; a hit is replayed without running the handler, a miss runs
/// the handler behind a [`CaptureWriter`] and stores the result when the
/// response filter allows it. Store failures are logged and counted, and
/// never reach the caller.
pub struct CacheMiddleware {
    config: CacheConfig,
}

impl CacheMiddleware {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up and decode the entry for `key`. Failures count as misses.
    async fn lookup(&self, key: &str) -> Option<ResponseEnvelope> {
        let bytes = match self.config.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                self.config.metrics.error();
                warn!(target: "hoard::cache", "Cache lookup failed for {}: {}", key, e);
                return None;
            }
        };

        match self.config.encoder.decode(&bytes) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                self.config.metrics.error();
                warn!(target: "hoard::cache", "Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &str, envelope: &ResponseEnvelope) {
        let bytes = match self.config.encoder.encode(envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.config.metrics.error();
                warn!(target: "hoard::cache", "Failed to encode response for {}: {}", key, e);
                return;
            }
        };

        self.config.metrics.size(bytes.len());
        match self.config.store.set(key, bytes, self.config.ttl).await {
            Ok(()) => debug!(target: "hoard::cache", "Stored response for {}", key),
            Err(e) => {
                self.config.metrics.error();
                warn!(target: "hoard::cache", "Failed to store response for {}: {}", key, e);
            }
        }
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        w: &mut dyn ResponseWriter,
        next: Next<'_>,
    ) -> Result<(), Error> {
        if self.config.skipper.should_skip(&req) {
            self.config.metrics.miss();
            trace!(target: "hoard::cache", "Skipping cache for {} {}", req.method, req.uri);
            return next.run(req, w).await;
        }

        let started = Instant::now();
        let key = self.config.key.derive_key(&self.config.prefix, &req);

        if let Some(envelope) = self.lookup(&key).await {
            envelope.replay(w).await?;
            self.config.metrics.hit();
            self.config.metrics.latency(started.elapsed());
            trace!(target: "hoard::cache", "Cache hit for {}", key);
            return Ok(());
        }

        self.config.metrics.miss();
        trace!(target: "hoard::cache", "Cache miss for {}", key);

        // The handler consumes the request; keep what the filter needs.
        let filter_req = HttpRequest {
            method: req.method.clone(),
            uri: req.uri.clone(),
            headers: req.headers.clone(),
            body: Vec::new(),
        };

        let mut capture = CaptureWriter::new(w);
        next.run(req, &mut capture).await?;

        if capture.is_hijacked() {
            debug!(target: "hoard::cache", "Connection hijacked, not caching {}", key);
            return Ok(());
        }

        let envelope = capture.into_envelope();
        if !self.config.filter.is_cacheable(&filter_req, &envelope) {
            trace!(
                target: "hoard::cache",
                "Response for {} is not cacheable (status {})", key, envelope.status_code
            );
            return Ok(());
        }

        self.store(&key, &envelope).await;
        Ok(())
    }
}
