//! Error types for the Mortar framework.
//!
//! Errors fall into three groups:
//!
//! - [`ConfigurationError`]: raised while routes are registered, before any
//!   request is served. These are fatal to startup.
//! - [`ResolveError`]: a dependency could not be found in the registry chain.
//! - [`ChainError`]: anything that aborts a single request's handler chain.

use thiserror::Error;

use http::Method;
use http::status::InvalidStatusCode;

/// A boxed, thread-safe error produced by user handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Returned when a type has no bound value anywhere in the registry chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No value is bound for the requested type.
    #[error("no value bound for type `{type_name}`")]
    Unbound {
        /// Name of the type that failed to resolve.
        type_name: &'static str,
    },
}

impl ResolveError {
    /// Creates an [`ResolveError::Unbound`] for `T`.
    pub fn unbound<T: ?Sized>() -> Self {
        Self::Unbound {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Result type for registry lookups.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors raised while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Two registrations share a method and an equivalent pattern.
    #[error("route {method} {pattern} is already registered")]
    DuplicateRoute {
        /// HTTP method of the colliding registration.
        method: Method,
        /// Fully composed pattern of the colliding registration.
        pattern: String,
    },

    /// The composed pattern cannot be registered.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl ConfigurationError {
    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason,
        }
    }
}

/// Result type for route registration.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Errors that abort the handler chain of a single request.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A handler parameter could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The execution loop was driven past its terminal state.
    #[error("handler chain driven past its terminal state (index {index}, {len} handlers)")]
    InvalidState {
        /// Cursor position at the time of the call.
        index: usize,
        /// Number of chain handlers, excluding the terminal action.
        len: usize,
    },

    /// Writing to the response failed.
    #[error("failed to write response: {0}")]
    Write(#[from] std::io::Error),

    /// A handler returned a numeric status outside `100..=999`.
    #[error("invalid response status: {0}")]
    InvalidStatus(#[from] InvalidStatusCode),

    /// A structured return value could not be serialized.
    #[error("failed to serialize return value: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A handler returned an error.
    #[error("handler failed: {0}")]
    Handler(BoxError),

    /// A handler panicked and the panic was intercepted.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl ChainError {
    /// Wraps a user error, keeping it intact if it already is a `ChainError`.
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<ChainError>() {
            Ok(chain) => *chain,
            Err(other) => Self::Handler(other),
        }
    }

    /// Returns `true` for errors caused by a missing dependency.
    pub fn is_resolve(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }
}

/// Result type for chain execution.
pub type ChainResult<T> = Result<T, ChainError>;
