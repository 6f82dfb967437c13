//! HTTP primitives for the hoard response cache.
//!
//! This crate holds the host-facing surface a caching layer needs:
//!
//! - [`Headers`] - ordered, case-insensitive multi-value headers
//! - [`HttpRequest`] / [`HttpResponse`] - request and buffered response values
//! - [`ResponseWriter`] - the response transport, with optional flush and hijack
//! - [`ResponseRecorder`] - an in-memory transport
//! - [`Middleware`], [`Handler`], [`Next`], [`MiddlewareChain`] - request pipeline
//!
//! ## Example
//!
//! ```
//! use hoard_core::{HttpRequest, HttpResponse, MiddlewareChain, ResponseRecorder, ResponseWriter};
//!
//! # tokio_test::block_on(async {
//! let chain = MiddlewareChain::new();
//! let handler = HttpResponse::ok().with_body("hello");
//! let mut rec = ResponseRecorder::new();
//!
//! chain.apply(HttpRequest::get("/"), &mut rec, &handler).await.unwrap();
//! assert_eq!(rec.status(), 200);
//! assert_eq!(rec.body(), b"hello");
//! # });
//! ```

pub mod error;
pub mod headers;
pub mod http;
pub mod middleware;
pub mod recorder;
pub mod writer;

pub use error::Error;
pub use headers::Headers;
pub use http::{HttpRequest, HttpResponse};
pub use middleware::{FnHandler, Handler, Middleware, MiddlewareChain, Next, handler_fn};
pub use recorder::ResponseRecorder;
pub use writer::{ResponseWriter, Upgraded};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::headers::Headers;
    pub use crate::http::{HttpRequest, HttpResponse};
    pub use crate::middleware::{Handler, Middleware, MiddlewareChain, Next, handler_fn};
    pub use crate::recorder::ResponseRecorder;
    pub use crate::writer::ResponseWriter;
}
