//! Common error types for the event tagger

use thiserror::Error;

/// Common result type for tagger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the tagger crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (blocks the dependent action, nothing is sent)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
