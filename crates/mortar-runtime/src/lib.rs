//! Mortar Runtime - configuration, logging and bootstrap for Mortar
//! applications.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `MortarConfig`)
//! - Logging setup on top of `tracing-subscriber` (`LoggingBuilder`)
//! - [`Runtime`], which loads both once and hands out applications with the
//!   configuration bound into their registry
//!
//! ```ignore
//! use mortar_runtime::Runtime;
//! use mortar_framework::chain;
//!
//! async fn hello() -> &'static str {
//!     "hi"
//! }
//!
//! let runtime = Runtime::new();
//! let mut app = runtime.classic();
//! app.router().get("/hello", chain![hello])?;
//!
//! // A transport listens on runtime.bind_addr() and calls app.serve(...)
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, MortarConfig, ServerConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{Runtime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
