// Middleware system for request/response processing

use crate::{Error, HttpRequest, HttpResponse, ResponseWriter};
use async_trait::async_trait;
use hoard_log::{debug, trace};
use std::sync::Arc;

/// Terminal request handler. Writes its response to the transport.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error>;
}

/// A fixed response handler, written out on every call.
#[async_trait]
impl Handler for HttpResponse {
    async fn call(&self, _req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        self.write_to(w).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        (**self).call(req, w).await
    }
}

/// Handler built from a synchronous function producing a buffered response.
pub struct FnHandler<F>(F);

/// Wrap `f` as a [`Handler`].
///
/// ```
/// use hoard_core::{handler_fn, HttpResponse};
///
/// let handler = handler_fn(|req| Ok(HttpResponse::ok().with_body(req.uri.clone())));
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, Error> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, Error> + Send + Sync,
{
    async fn call(&self, req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        let resp = (self.0)(&req)?;
        resp.write_to(w).await
    }
}

/// Remainder of a middleware chain, ending in the handler.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], handler: &'a dyn Handler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    /// Run the next middleware, or the handler once the chain is exhausted.
    pub async fn run(self, req: HttpRequest, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                trace!("Executing middleware, {} remaining", rest.len());
                current.handle(req, w, Next::new(rest, self.handler)).await
            }
            None => {
                trace!("Middleware chain complete, calling handler");
                self.handler.call(req, w).await
            }
        }
    }
}

/// Middleware trait for wrapping a handler.
///
/// A middleware may answer the request itself, or pass it on with
/// `next.run(req, w)`, possibly with a wrapped transport.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        req: HttpRequest,
        w: &mut dyn ResponseWriter,
        next: Next<'_>,
    ) -> Result<(), Error>;
}

/// Middleware chain executor
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.use_arc(Arc::new(middleware));
    }

    /// Add a shared middleware to the chain
    pub fn use_arc(&mut self, middleware: Arc<dyn Middleware>) {
        let mut mws = (*self.middlewares).clone();
        mws.push(middleware);
        self.middlewares = Arc::new(mws);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(
        &self,
        req: HttpRequest,
        w: &mut dyn ResponseWriter,
        handler: &dyn Handler,
    ) -> Result<(), Error> {
        debug!(
            "Executing middleware chain ({} middleware) for {} {}",
            self.middlewares.len(),
            req.method,
            req.uri
        );
        Next::new(&self.middlewares, handler).run(req, w).await
    }
}
