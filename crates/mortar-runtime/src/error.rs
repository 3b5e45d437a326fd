//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use mortar_core::ConfigurationError;

/// Errors that can occur while bootstrapping an application.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route could not be registered.
    #[error("Route registration failed: {0}")]
    Routing(#[from] ConfigurationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
