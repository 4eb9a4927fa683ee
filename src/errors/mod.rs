//! # Error Handling
//!
//! Startup error taxonomy for swagger-mcp. Anything in here is fatal: no tool
//! can be offered without a valid document and configuration. Per-call failures
//! live in [`crate::mcp::gateway::executor::DispatchError`] and never reach this type.

use crate::config::ConfigError;
use crate::openapi::loader::LoadError;

/// Custom result type for swagger-mcp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for swagger-mcp startup and transports
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The API description could not be fetched or decoded
    #[error("Spec load error: {0}")]
    SpecLoad(#[from] LoadError),

    /// Network transport errors (HTTP listener, stdio framing)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }
}
