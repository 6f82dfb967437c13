// Error types for request handling and response transports

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The response transport lacks an optional capability such as
    /// `flush` or `hijack`.
    #[error("Response transport does not support {0}")]
    Unsupported(&'static str),

    #[error("Connection has been hijacked")]
    Hijacked,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Status code a host framework should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unsupported(_) => 501,
            _ => 500,
        }
    }

    /// Whether this error came from a missing transport capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}
