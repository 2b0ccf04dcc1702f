//! Client error types

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the API client and the state built on top of it
#[derive(Error, Debug)]
pub enum Error {
    /// Request never produced a response (connection refused, reset, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Rejected locally before any request was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Action not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Common(tagger_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure came from the backend or the transport
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Api { .. } | Error::Decode(_))
    }
}

/// Validation failures keep their class; everything else is wrapped
impl From<tagger_common::Error> for Error {
    fn from(e: tagger_common::Error) -> Self {
        match e {
            tagger_common::Error::InvalidInput(message) => Error::InvalidInput(message),
            other => Error::Common(other),
        }
    }
}
