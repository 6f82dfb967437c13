//! The response transport seen by handlers and middleware.

use crate::{Error, Headers};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A raw bidirectional connection taken over from a response transport.
pub trait Upgraded: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Upgraded for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Sink for one HTTP response.
///
/// Headers may be edited until the status is committed by the first body
/// write. `write_header` records the status; whether a second call before
/// the body replaces it is up to the implementation. Flushing and hijacking
/// are optional capabilities that report [`Error::Unsupported`] when absent.
#[async_trait]
pub trait ResponseWriter: Send {
    fn headers(&self) -> &Headers;

    fn headers_mut(&mut self) -> &mut Headers;

    /// Set the response status code.
    fn write_header(&mut self, status: u16);

    /// Status the response currently carries.
    fn status(&self) -> u16;

    /// Number of body bytes accepted so far.
    fn bytes_written(&self) -> usize;

    /// Write a chunk of the body and return how many bytes were accepted.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error>;

    /// Write the whole buffer, failing if the transport stops accepting bytes.
    async fn write_all(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        while !buf.is_empty() {
            let n = self.write(buf).await?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "response transport accepted zero bytes",
                )));
            }
            buf = &buf[n..];
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Err(Error::Unsupported("flush"))
    }

    /// Take over the underlying connection.
    async fn hijack(&mut self) -> Result<Box<dyn Upgraded>, Error> {
        Err(Error::Unsupported("hijack"))
    }
}
