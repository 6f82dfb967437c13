//! Response capture interceptor.

use crate::envelope::ResponseEnvelope;
use async_trait::async_trait;
use hoard_core::{Error, Headers, ResponseWriter, Upgraded};

/// Transport wrapper that forwards every byte and keeps a copy.
///
/// Bytes are forwarded first; only what the inner transport accepted is
/// buffered. Flush and hijack pass through, so streaming handlers keep
/// working behind the cache.
pub struct CaptureWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    buffer: Vec<u8>,
    status: Option<u16>,
    body_started: bool,
    hijacked: bool,
}

impl<'a> CaptureWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            status: None,
            body_started: false,
            hijacked: false,
        }
    }

    /// Status captured so far: the last one set before the body, otherwise
    /// whatever the transport applied.
    pub fn captured_status(&self) -> u16 {
        self.status.unwrap_or_else(|| self.inner.status())
    }

    pub fn captured_body(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }

    /// Snapshot the captured response.
    pub fn envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::new(
            self.captured_status(),
            self.inner.headers().clone(),
            self.buffer.clone(),
        )
    }

    /// Consume the capture and return the captured response.
    pub fn into_envelope(self) -> ResponseEnvelope {
        let status = self.captured_status();
        ResponseEnvelope::new(status, self.inner.headers().clone(), self.buffer)
    }
}

#[async_trait]
impl<'a> ResponseWriter for CaptureWriter<'a> {
    fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut Headers {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        if !self.body_started {
            self.status = Some(status);
        }
        self.inner.write_header(status);
    }

    fn status(&self) -> u16 {
        self.captured_status()
    }

    fn bytes_written(&self) -> usize {
        self.inner.bytes_written()
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let n = self.inner.write(buf).await?;
        self.body_started = true;
        self.buffer.extend_from_slice(&buf[..n.min(buf.len())]);
        Ok(n)
    }

    async fn flush(&mut self) -> Result<(), Error> {
        self.inner.flush().await
    }

    async fn hijack(&mut self) -> Result<Box<dyn Upgraded>, Error> {
        let conn = self.inner.hijack().await?;
        self.hijacked = true;
        Ok(conn)
    }
}
