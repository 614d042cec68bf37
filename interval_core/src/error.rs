//! Error types for the interval_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for interval_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable store unavailable or refusing writes
    #[error("Store error: {0}")]
    Store(String),

    /// A persisted session snapshot failed validation
    #[error("Invalid session snapshot: {0}")]
    InvalidSnapshot(String),

    /// User-supplied configuration input was malformed or out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Command not permitted in the current timer state
    #[error("State error: {0}")]
    State(String),
}
