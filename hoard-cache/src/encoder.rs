//! Envelope encodings.
//!
//! The two encodings are not interoperable; a deployment must keep one for
//! the lifetime of its stored data.

use crate::envelope::ResponseEnvelope;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to encode response envelope: {0}")]
pub struct EncodeError(pub String);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed response envelope: {0}")]
    Malformed(String),

    #[error("Invalid status code in response envelope: {0}")]
    InvalidStatus(u16),
}

/// Bijective mapping between a [`ResponseEnvelope`] and bytes.
pub trait Encoder: Send + Sync {
    fn encode(&self, envelope: &ResponseEnvelope) -> Result<Vec<u8>, EncodeError>;

    /// Decode bytes produced by [`Encoder::encode`]. Never panics on bad input.
    fn decode(&self, bytes: &[u8]) -> Result<ResponseEnvelope, DecodeError>;

    fn name(&self) -> &'static str;
}

fn check_status(envelope: ResponseEnvelope) -> Result<ResponseEnvelope, DecodeError> {
    if !(100..=999).contains(&envelope.status_code) {
        return Err(DecodeError::InvalidStatus(envelope.status_code));
    }
    Ok(envelope)
}

/// Self-describing JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, envelope: &ResponseEnvelope) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(envelope).map_err(|e| EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ResponseEnvelope, DecodeError> {
        let envelope =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        check_status(envelope)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Compact positional MessagePack encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackEncoder;

impl Encoder for MsgpackEncoder {
    fn encode(&self, envelope: &ResponseEnvelope) -> Result<Vec<u8>, EncodeError> {
        rmp_serde::to_vec(envelope).map_err(|e| EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ResponseEnvelope, DecodeError> {
        let envelope =
            rmp_serde::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        check_status(envelope)
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }
}
