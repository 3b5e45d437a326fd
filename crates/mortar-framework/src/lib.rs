//! # Mortar Framework
//!
//! The request-dispatch core of Mortar.
//!
//! This layer provides:
//! - [`Context`]: the per-request execution loop with explicit continuation
//!   through [`Next`]
//! - The [`Handler`] trait with Axum-style parameter injection
//! - [`Router`] with nested prefix/handler groups
//! - [`Application`], which ties the registry, middleware, routes and the
//!   terminal action together and exposes [`Application::serve`]
//! - Stock middleware: [`logger`], [`recovery`] and [`static_files`]
//!
//! ```rust,ignore
//! use mortar_framework::{Application, chain};
//!
//! async fn hello() -> &'static str {
//!     "hi"
//! }
//!
//! let mut app = Application::classic();
//! app.router().get("/hello", chain![hello])?;
//! ```

pub mod app;
pub mod context;
pub mod extractor;
pub mod handler;
pub mod middleware;
pub mod router;
pub mod service;

pub use app::{Application, DEFAULT_STATIC_DIR};
pub use context::Context;
pub use extractor::{FromContext, Next};
pub use handler::{BoxedHandler, Handler, HandlerFuture, into_handler};
pub use middleware::{logger, recovery, static_files};
pub use router::{ANY_METHODS, Endpoint, Params, PathMatcher, Router, SegmentMatcher};
pub use service::AppService;

pub use mortar_core::{
    BoxError, BufferedResponse, ChainError, ChainResult, ConfigResult, ConfigurationError, Dep,
    DefaultReturnHandler, HeaderMap, HeaderName, HeaderValue, Injectable, Injector,
    IntoReturnValues, Json, Method, Mode, Request, ResolveError, ResponseSink, ResponseWriter,
    ReturnHandler, ReturnValue, ReturnValues, Status, StatusCode, header,
};

/// Builds a `Vec<BoxedHandler>` from a list of handlers.
///
/// ```rust,ignore
/// router.get("/users/:id", chain![auth, load_user, show_user])?;
/// ```
#[macro_export]
macro_rules! chain {
    ($($handler:expr),* $(,)?) => {
        ::std::vec![$($crate::handler::into_handler($handler)),*]
    };
}
