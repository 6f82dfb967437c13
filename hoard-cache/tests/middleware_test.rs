//! End-to-end behaviour of the caching middleware.

use async_trait::async_trait;
use hoard_cache::*;
use hoard_core::*;
use hoard_store::{MemoryStore, Store, StoreError, StoreResult};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Handler answering with a fixed response and counting its calls.
struct CountingHandler {
    calls: AtomicUsize,
    response: HttpResponse,
}

impl CountingHandler {
    fn new(response: HttpResponse) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for CountingHandler {
    async fn call(&self, req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.call(req, w).await
    }
}

/// Store wrapper counting traffic and injecting failures.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    last_key: Mutex<Option<String>>,
}

#[async_trait]
impl Store for FaultyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        *self.last_key.lock().unwrap() = Some(key.to_string());
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Other("lookup unavailable".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::Other("write unavailable".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }
}

struct Harness {
    chain: MiddlewareChain,
    store: Arc<FaultyStore>,
    stats: Arc<CacheStats>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|config| config)
    }

    fn with_config(customize: impl FnOnce(CacheConfig) -> CacheConfig) -> Self {
        let store = Arc::new(FaultyStore::default());
        let stats = Arc::new(CacheStats::new());
        let config = customize(CacheConfig::new(store.clone()).with_metrics(stats.clone()));

        let mut chain = MiddlewareChain::new();
        chain.use_middleware(CacheMiddleware::new(config));
        Self {
            chain,
            store,
            stats,
        }
    }

    async fn send(&self, req: HttpRequest, handler: &dyn Handler) -> ResponseRecorder {
        let mut rec = ResponseRecorder::new();
        self.chain.apply(req, &mut rec, handler).await.unwrap();
        rec
    }

    fn sets(&self) -> usize {
        self.store.sets.load(Ordering::SeqCst)
    }

    fn gets(&self) -> usize {
        self.store.gets.load(Ordering::SeqCst)
    }
}

fn ok_response() -> HttpResponse {
    HttpResponse::ok().with_header("X-TEST", "OK").with_body("OK")
}

#[tokio::test]
async fn test_get_is_stored_then_replayed() {
    let harness = Harness::new();
    let handler = CountingHandler::new(ok_response());

    let first = harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers().get("X-TEST"), Some("OK"));
    assert_eq!(first.body(), b"OK");
    assert_eq!(harness.sets(), 1);

    let second = harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(second.status(), 200);
    assert_eq!(second.headers().get("X-TEST"), Some("OK"));
    assert_eq!(second.body(), b"OK");

    assert_eq!(handler.calls(), 1);
    let stats = harness.stats.snapshot();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_post_is_never_looked_up_or_stored() {
    let harness = Harness::new();
    let handler = CountingHandler::new(ok_response());

    for _ in 0..2 {
        let rec = harness
            .send(HttpRequest::new("POST", "/cache"), &handler)
            .await;
        assert_eq!(rec.body(), b"OK");
    }

    assert_eq!(handler.calls(), 2);
    assert_eq!(harness.gets(), 0);
    assert_eq!(harness.sets(), 0);
    assert_eq!(harness.stats.snapshot().misses, 2);
}

#[tokio::test]
async fn test_range_request_bypasses_cache() {
    let harness = Harness::new();
    let handler = CountingHandler::new(ok_response());

    let req = HttpRequest::get("/cache").with_header("Range", "bytes=0-1");
    harness.send(req, &handler).await;
    assert_eq!(harness.gets(), 0);
    assert_eq!(harness.sets(), 0);
}

#[tokio::test]
async fn test_error_status_is_not_stored() {
    let harness = Harness::new();
    let handler = CountingHandler::new(HttpResponse::new(400).with_body("bad"));

    let rec = harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(rec.status(), 400);
    assert_eq!(rec.body(), b"bad");
    assert_eq!(harness.sets(), 0);

    harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(handler.calls(), 2);
}

#[tokio::test]
async fn test_set_cookie_response_is_not_stored() {
    let harness = Harness::new();
    let handler = CountingHandler::new(ok_response().with_header("Set-Cookie", "session=abc"));

    harness.send(HttpRequest::get("/login"), &handler).await;
    assert_eq!(harness.sets(), 0);
}

#[tokio::test]
async fn test_handler_error_is_returned_and_nothing_stored() {
    let harness = Harness::new();
    let handler = handler_fn(|_| Err(Error::Handler("database down".to_string())));

    let mut rec = ResponseRecorder::new();
    let err = harness
        .chain
        .apply(HttpRequest::get("/cache"), &mut rec, &handler)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Handler(ref msg) if msg == "database down"));
    assert_eq!(harness.sets(), 0);
}

#[tokio::test]
async fn test_lookup_error_falls_through_to_handler() {
    let harness = Harness::new();
    harness.store.fail_get.store(true, Ordering::SeqCst);
    let handler = CountingHandler::new(ok_response());

    let rec = harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(rec.body(), b"OK");
    assert_eq!(handler.calls(), 1);
    assert_eq!(harness.sets(), 1);

    let stats = harness.stats.snapshot();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_write_failure_is_invisible_to_caller() {
    let harness = Harness::new();
    harness.store.fail_set.store(true, Ordering::SeqCst);
    let handler = CountingHandler::new(ok_response());

    let rec = harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(rec.status(), 200);
    assert_eq!(rec.body(), b"OK");

    let stats = harness.stats.snapshot();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test]
async fn test_corrupted_entry_is_treated_as_miss() {
    let harness = Harness::new();
    harness
        .store
        .inner
        .set("cache-GET-/cache", b"\xc1garbage".to_vec(), Duration::ZERO)
        .await
        .unwrap();
    let handler = CountingHandler::new(ok_response());

    let rec = harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(rec.body(), b"OK");
    assert_eq!(handler.calls(), 1);
    assert_eq!(harness.stats.snapshot().errors, 1);

    harness.send(HttpRequest::get("/cache"), &handler).await;
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn test_multi_value_headers_replay_in_order() {
    let harness = Harness::new();
    let handler = CountingHandler::new(
        HttpResponse::ok()
            .with_header("Vary", "Accept")
            .with_header("X-Multi", "first")
            .with_header("x-multi", "second")
            .with_body("body"),
    );

    harness.send(HttpRequest::get("/multi"), &handler).await;

    let mut rec = ResponseRecorder::new();
    rec.headers_mut().set("X-Multi", "stale");
    harness
        .chain
        .apply(HttpRequest::get("/multi"), &mut rec, &*handler)
        .await
        .unwrap();

    assert_eq!(handler.calls(), 1);
    assert_eq!(rec.headers().get_all("X-Multi").to_vec(), vec!["first", "second"]);
    assert_eq!(rec.headers().get("vary"), Some("Accept"));
}

#[tokio::test]
async fn test_custom_prefix_and_key() {
    let harness = Harness::with_config(|config| config.with_prefix("pages"));
    let handler = CountingHandler::new(ok_response());

    harness.send(HttpRequest::get("/a?b=1"), &handler).await;
    assert_eq!(
        harness.store.last_key.lock().unwrap().as_deref(),
        Some("pages-GET-/a?b=1")
    );

    let harness = Harness::with_config(|config| {
        config.with_key(Arc::new(|prefix: &str, req: &HttpRequest| {
            format!("{prefix}:{}", req.path())
        }))
    });
    harness.send(HttpRequest::get("/a?b=1"), &handler).await;
    harness.send(HttpRequest::get("/a?b=2"), &handler).await;
    assert_eq!(harness.store.last_key.lock().unwrap().as_deref(), Some("cache:/a"));
    assert_eq!(harness.sets(), 1);
}

#[tokio::test]
async fn test_entries_expire_after_ttl() {
    let harness = Harness::with_config(|config| config.with_ttl(Duration::from_millis(300)));
    let handler = CountingHandler::new(ok_response());

    harness.send(HttpRequest::get("/ttl"), &handler).await;
    harness.send(HttpRequest::get("/ttl"), &handler).await;
    assert_eq!(handler.calls(), 1);

    tokio::time::sleep(Duration::from_millis(800)).await;
    harness.send(HttpRequest::get("/ttl"), &handler).await;
    assert_eq!(handler.calls(), 2);
}

#[tokio::test]
async fn test_json_encoder_round_trips_through_store() {
    let harness = Harness::with_config(|config| config.with_encoder(Arc::new(JsonEncoder)));
    let handler = CountingHandler::new(ok_response());

    harness.send(HttpRequest::get("/json"), &handler).await;
    let raw = harness.store.inner.get("cache-GET-/json").await.unwrap().unwrap();
    assert!(raw.starts_with(b"{"));

    let rec = harness.send(HttpRequest::get("/json"), &handler).await;
    assert_eq!(rec.body(), b"OK");
    assert_eq!(handler.calls(), 1);
}

struct Upgrading;

#[async_trait]
impl Handler for Upgrading {
    async fn call(&self, _req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        w.write_header(200);
        let _conn = w.hijack().await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_hijacked_connection_is_not_stored() {
    let harness = Harness::new();
    let (conn, _peer) = tokio::io::duplex(64);
    let mut rec = ResponseRecorder::new().with_upgrade(conn);

    harness
        .chain
        .apply(HttpRequest::get("/ws"), &mut rec, &Upgrading)
        .await
        .unwrap();

    assert!(rec.is_hijacked());
    assert_eq!(harness.sets(), 0);
}

struct Streaming;

#[async_trait]
impl Handler for Streaming {
    async fn call(&self, _req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        for chunk in ["one ", "two ", "three"] {
            w.write_all(chunk.as_bytes()).await?;
            w.flush().await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_streamed_response_is_flushed_and_stored_whole() {
    let harness = Harness::new();

    let mut rec = ResponseRecorder::new();
    harness
        .chain
        .apply(HttpRequest::get("/stream"), &mut rec, &Streaming)
        .await
        .unwrap();
    assert_eq!(rec.flush_count(), 3);

    let replay = harness.send(HttpRequest::get("/stream"), &Streaming).await;
    assert_eq!(replay.body(), b"one two three");
    assert_eq!(replay.flush_count(), 0);
}

#[tokio::test]
async fn test_file_store_backend() {
    let dir = tempfile::tempdir().unwrap();
    let store = hoard_store::FileStore::open(dir.path().join("cache.redb"))
        .await
        .unwrap();
    let store: Arc<dyn Store> = Arc::new(store);

    let mut chain = MiddlewareChain::new();
    chain.use_middleware(CacheMiddleware::new(CacheConfig::new(store.clone())));
    let handler = CountingHandler::new(ok_response());

    for _ in 0..3 {
        let mut rec = ResponseRecorder::new();
        chain
            .apply(HttpRequest::get("/disk"), &mut rec, &*handler)
            .await
            .unwrap();
        assert_eq!(rec.body(), b"OK");
    }
    assert_eq!(handler.calls(), 1);
    store.close().await.unwrap();
}
