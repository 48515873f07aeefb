//! Core error types

use thiserror::Error;

/// Core error type for AetherNet
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration parse errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
