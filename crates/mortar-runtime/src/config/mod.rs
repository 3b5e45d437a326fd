//! Configuration for Mortar applications.
//!
//! Configuration is read once at startup by [`ConfigLoader`], validated, and
//! then only passed around by value. The loaded [`MortarConfig`] and its
//! [`Mode`](mortar_core::Mode) are bound into the application registry.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MortarConfig, ServerConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
