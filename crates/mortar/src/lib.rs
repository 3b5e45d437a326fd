//! # Mortar
//!
//! A small middleware framework built around a type-indexed dependency
//! registry and explicit handler chains.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  serve(request, writer)  ┌─────────────┐  per request  ┌──────────────────────────────┐
//! │ Transport │─────────────────────────▶│ Application │──────────────▶│ Context                      │
//! └───────────┘                          │  registry   │               │  child registry              │
//!                                        │  middleware │               │  middleware ++ route chain   │
//!                                        │  router     │               │  action, cursor, sink        │
//!                                        └─────────────┘               └──────────────────────────────┘
//! ```
//!
//! - **Application**: root registry, middleware stack, router and terminal action
//! - **Context**: runs one request's chain; handlers continue it with `Next`
//! - **Handlers**: async functions whose parameters are resolved by type
//! - **Return handler**: turns handler return values into the response
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mortar::prelude::*;
//!
//! async fn hello(params: Params) -> String {
//!     format!("hello {}", params.get("name").unwrap_or("world"))
//! }
//!
//! fn main() -> RuntimeResult<()> {
//!     let runtime = Runtime::new();
//!     let mut app = runtime.classic();
//!     app.router().get("/hello/:name", chain![hello])?;
//!     // hand `app` (or `app.into_service()`) to a transport
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `mortar.toml` (default)
//! - `yaml-config`: load `mortar.yaml`
//! - `json-log`: JSON log output

pub use mortar_core as core;
pub use mortar_framework as framework;
pub use mortar_runtime as runtime;

pub use mortar_framework::chain;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use mortar::prelude::*;
/// ```
pub mod prelude {
    // Runtime - configuration and bootstrap
    pub use mortar_runtime::{MortarConfig, Runtime, RuntimeError, RuntimeResult};

    // Application and routing
    pub use mortar_framework::{Application, Params, Router, chain};

    // Handler parameters
    pub use mortar_framework::{Context, FromContext, Next};
    pub use mortar_core::Dep;

    // Return values
    pub use mortar_core::{Json, ReturnValue, ReturnValues, Status};

    // Request and response
    pub use mortar_core::{BufferedResponse, Request, ResponseSink, ResponseWriter};
    pub use mortar_core::{HeaderName, HeaderValue, Method, StatusCode, header};

    // Errors
    pub use mortar_core::{BoxError, ChainError, ChainResult, ConfigurationError};

    // Middleware
    pub use mortar_framework::{logger, recovery, static_files};

    pub use mortar_core::Mode;
}
