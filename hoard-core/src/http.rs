// HTTP request and response types

use crate::{Error, Headers, ResponseWriter};
use serde::Serialize;

/// HTTP request as seen by middleware.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    /// Request target: path plus optional query string.
    pub uri: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Path portion of the request target.
    pub fn path(&self) -> &str {
        match self.uri.split_once('?') {
            Some((path, _)) => path,
            None => &self.uri,
        }
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, query)| query)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

/// A complete, buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers.set("Content-Type", "application/json");
        Ok(self)
    }

    /// Emit this response on a transport: headers, then status, then body.
    pub async fn write_to(&self, w: &mut dyn ResponseWriter) -> Result<(), Error> {
        for (name, values) in self.headers.iter() {
            w.headers_mut().set_all(name, values.to_vec());
        }
        w.write_header(self.status);
        if !self.body.is_empty() {
            w.write_all(&self.body).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let req = HttpRequest::get("/search?q=rust&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=rust&page=2"));

        let req = HttpRequest::get("/plain");
        assert_eq!(req.path(), "/plain");
        assert_eq!(req.query(), None);
    }

    #[test]
    fn test_request_header_lookup() {
        let req = HttpRequest::new("GET", "/").with_header("Range", "bytes=0-10");
        assert_eq!(req.header("range"), Some("bytes=0-10"));
    }

    #[test]
    fn test_with_json_sets_content_type() {
        let resp = HttpResponse::ok()
            .with_json(&serde_json::json!({"hello": "world"}))
            .unwrap();
        assert_eq!(resp.headers.get("content-type"), Some("application/json"));
        assert_eq!(resp.body, br#"{"hello":"world"}"#);
    }
}
