//! Error types for habitua-core

use thiserror::Error;

/// Main error type for the habitua-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session store error
    #[error("store error: {0}")]
    Store(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),
}

/// Result type alias for habitua-core
pub type Result<T> = std::result::Result<T, Error>;
