//! # Error Types
//!
//! Custom error types for Spectro Viewer using `thiserror`.

use thiserror::Error;

/// Main error type for Spectro Viewer
#[derive(Debug, Error)]
pub enum SpectroError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors (terminal, log files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Broker URL could not be parsed
    #[error("Invalid broker URL: {0}")]
    BrokerUrl(String),

    /// Pub/sub transport errors (subscribe failures, dead event stream)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Chart dataset serialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Spectro Viewer
pub type Result<T> = std::result::Result<T, SpectroError>;
