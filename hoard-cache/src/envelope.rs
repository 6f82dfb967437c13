//! Stored form of a captured response.

use hoard_core::{Headers, HttpResponse, ResponseWriter};
use serde::{Deserialize, Serialize};

/// Status, headers and body of one response, as kept in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: Headers,
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn new(status_code: u16, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// Replay onto a transport: copy headers (replacing same-named ones),
    /// write the status, then the body.
    pub async fn replay(&self, w: &mut dyn ResponseWriter) -> Result<(), hoard_core::Error> {
        for (name, values) in self.headers.iter() {
            w.headers_mut().set_all(name, values.to_vec());
        }
        w.write_header(self.status_code);
        if !self.body.is_empty() {
            w.write_all(&self.body).await?;
        }
        Ok(())
    }
}

impl From<HttpResponse> for ResponseEnvelope {
    fn from(resp: HttpResponse) -> Self {
        Self::new(resp.status, resp.headers, resp.body)
    }
}

impl From<ResponseEnvelope> for HttpResponse {
    fn from(envelope: ResponseEnvelope) -> Self {
        HttpResponse {
            status: envelope.status_code,
            headers: envelope.headers,
            body: envelope.body,
        }
    }
}
