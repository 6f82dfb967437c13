//! Request skip, response eligibility and key derivation policies.

use crate::envelope::ResponseEnvelope;
use hoard_core::HttpRequest;

/// Largest body the default filter will cache (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default prefix for derived cache keys.
pub const DEFAULT_KEY_PREFIX: &str = "cache";

/// Decides whether a request bypasses the cache entirely.
pub trait RequestSkipper: Send + Sync {
    fn should_skip(&self, req: &HttpRequest) -> bool;
}

impl<F> RequestSkipper for F
where
    F: Fn(&HttpRequest) -> bool + Send + Sync,
{
    fn should_skip(&self, req: &HttpRequest) -> bool {
        self(req)
    }
}

/// Skips every method except GET and HEAD, and any range request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSkipper;

impl RequestSkipper for DefaultSkipper {
    fn should_skip(&self, req: &HttpRequest) -> bool {
        let cacheable_method =
            req.method.eq_ignore_ascii_case("GET") || req.method.eq_ignore_ascii_case("HEAD");
        !cacheable_method || req.headers.contains("Range")
    }
}

/// Decides whether a captured response may be stored.
pub trait ResponseFilter: Send + Sync {
    fn is_cacheable(&self, req: &HttpRequest, response: &ResponseEnvelope) -> bool;
}

impl<F> ResponseFilter for F
where
    F: Fn(&HttpRequest, &ResponseEnvelope) -> bool + Send + Sync,
{
    fn is_cacheable(&self, req: &HttpRequest, response: &ResponseEnvelope) -> bool {
        self(req, response)
    }
}

/// Stores 200, 301 and 308 responses without cookies and under a size cap.
#[derive(Debug, Clone, Copy)]
pub struct DefaultResponseFilter {
    pub max_body_size: usize,
}

impl Default for DefaultResponseFilter {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl DefaultResponseFilter {
    pub fn with_max_body_size(max_body_size: usize) -> Self {
        Self { max_body_size }
    }
}

impl ResponseFilter for DefaultResponseFilter {
    fn is_cacheable(&self, _req: &HttpRequest, response: &ResponseEnvelope) -> bool {
        matches!(response.status_code, 200 | 301 | 308)
            && !response.headers.contains("Set-Cookie")
            && response.body.len() <= self.max_body_size
    }
}

/// Maps a request to its cache key.
pub trait KeyDeriver: Send + Sync {
    fn derive_key(&self, prefix: &str, req: &HttpRequest) -> String;
}

impl<F> KeyDeriver for F
where
    F: Fn(&str, &HttpRequest) -> String + Send + Sync,
{
    fn derive_key(&self, prefix: &str, req: &HttpRequest) -> String {
        self(prefix, req)
    }
}

/// `{prefix}-{method}-{uri}`, where the uri includes the query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyDeriver;

impl KeyDeriver for DefaultKeyDeriver {
    fn derive_key(&self, prefix: &str, req: &HttpRequest) -> String {
        format!("{}-{}-{}", prefix, req.method, req.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_core::Headers;

    fn response(status: u16) -> ResponseEnvelope {
        ResponseEnvelope::new(status, Headers::new(), b"body".to_vec())
    }

    #[test]
    fn test_default_skipper() {
        let skipper = DefaultSkipper;
        assert!(!skipper.should_skip(&HttpRequest::get("/")));
        assert!(!skipper.should_skip(&HttpRequest::new("HEAD", "/")));
        assert!(skipper.should_skip(&HttpRequest::new("POST", "/")));
        assert!(skipper.should_skip(&HttpRequest::new("DELETE", "/")));
        assert!(skipper.should_skip(&HttpRequest::get("/").with_header("range", "bytes=0-1")));
    }

    #[test]
    fn test_default_filter_statuses() {
        let filter = DefaultResponseFilter::default();
        let req = HttpRequest::get("/");
        for status in [200, 301, 308] {
            assert!(filter.is_cacheable(&req, &response(status)), "{status}");
        }
        for status in [201, 204, 302, 304, 400, 404, 500] {
            assert!(!filter.is_cacheable(&req, &response(status)), "{status}");
        }
    }

    #[test]
    fn test_default_filter_rejects_cookies_and_large_bodies() {
        let req = HttpRequest::get("/");
        let mut with_cookie = response(200);
        with_cookie.headers.add("set-cookie", "session=1");
        assert!(!DefaultResponseFilter::default().is_cacheable(&req, &with_cookie));

        let filter = DefaultResponseFilter::with_max_body_size(4);
        assert!(filter.is_cacheable(&req, &response(200)));
        let big = ResponseEnvelope::new(200, Headers::new(), vec![0; 5]);
        assert!(!filter.is_cacheable(&req, &big));
    }

    #[test]
    fn test_default_key() {
        let req = HttpRequest::get("/cache?page=2");
        assert_eq!(DefaultKeyDeriver.derive_key("cache", &req), "cache-GET-/cache?page=2");
    }

    #[test]
    fn test_closures_as_policies() {
        let skip_admin = |req: &HttpRequest| req.path().starts_with("/admin");
        assert!(skip_admin.should_skip(&HttpRequest::get("/admin/users")));

        let path_only = |prefix: &str, req: &HttpRequest| format!("{prefix}:{}", req.path());
        assert_eq!(path_only.derive_key("p", &HttpRequest::get("/a?b=c")), "p:/a");
    }
}
