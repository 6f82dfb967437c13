//! In-memory response transport.

use crate::{Error, Headers, HttpResponse, ResponseWriter, Upgraded};
use async_trait::async_trait;

/// A [`ResponseWriter`] that records everything written to it.
///
/// Used by tests and by hosts that want a buffered response. The status may
/// change freely until the first body write commits it; an untouched
/// recorder reports 200. Flush is supported by default and counted. Hijack
/// is only supported when a connection has been attached with
/// [`ResponseRecorder::with_upgrade`].
pub struct ResponseRecorder {
    headers: Headers,
    status: u16,
    committed: bool,
    body: Vec<u8>,
    flushes: usize,
    supports_flush: bool,
    upgrade: Option<Box<dyn Upgraded>>,
    hijacked: bool,
    fail_writes: bool,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            status: 200,
            committed: false,
            body: Vec::new(),
            flushes: 0,
            supports_flush: true,
            upgrade: None,
            hijacked: false,
            fail_writes: false,
        }
    }

    /// Report flush as unsupported.
    pub fn without_flush(mut self) -> Self {
        self.supports_flush = false;
        self
    }

    /// Attach a connection handed out by `hijack`.
    pub fn with_upgrade(mut self, conn: impl Upgraded + 'static) -> Self {
        self.upgrade = Some(Box::new(conn));
        self
    }

    /// Make every body write fail with a broken pipe.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }

    /// Snapshot of the recorded response.
    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

#[async_trait]
impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) {
        if !self.committed {
            self.status = status;
        }
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn bytes_written(&self) -> usize {
        self.body.len()
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if self.hijacked {
            return Err(Error::Hijacked);
        }
        if self.fail_writes {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "recorder configured to fail writes",
            )));
        }
        self.committed = true;
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if !self.supports_flush {
            return Err(Error::Unsupported("flush"));
        }
        self.flushes += 1;
        Ok(())
    }

    async fn hijack(&mut self) -> Result<Box<dyn Upgraded>, Error> {
        if self.hijacked {
            return Err(Error::Hijacked);
        }
        match self.upgrade.take() {
            Some(conn) => {
                self.hijacked = true;
                Ok(conn)
            }
            None => Err(Error::Unsupported("hijack")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_commits_on_first_write() {
        let mut rec = ResponseRecorder::new();
        assert_eq!(rec.status(), 200);

        rec.write_header(201);
        rec.write_header(202);
        assert_eq!(rec.status(), 202);

        rec.write_all(b"body").await.unwrap();
        rec.write_header(500);
        assert_eq!(rec.status(), 202);
        assert_eq!(rec.body(), b"body");
        assert_eq!(rec.bytes_written(), 4);
    }

    #[tokio::test]
    async fn test_flush_capability() {
        let mut rec = ResponseRecorder::new();
        rec.flush().await.unwrap();
        rec.flush().await.unwrap();
        assert_eq!(rec.flush_count(), 2);

        let mut rec = ResponseRecorder::new().without_flush();
        assert!(rec.flush().await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn test_hijack_requires_upgrade() {
        let mut rec = ResponseRecorder::new();
        assert!(matches!(rec.hijack().await, Err(Error::Unsupported("hijack"))));

        let (conn, _peer) = tokio::io::duplex(64);
        let mut rec = ResponseRecorder::new().with_upgrade(conn);
        assert!(rec.hijack().await.is_ok());
        assert!(rec.is_hijacked());
        assert!(matches!(rec.write(b"late").await, Err(Error::Hijacked)));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let mut rec = ResponseRecorder::new().with_failing_writes();
        assert!(matches!(rec.write(b"x").await, Err(Error::Io(_))));
        assert!(rec.body().is_empty());
    }
}
