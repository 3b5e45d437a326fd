//! # Mortar Core
//!
//! Foundation types shared by every layer of the Mortar middleware framework.
//!
//! This crate provides:
//! - The type-indexed dependency registry ([`Injector`]) with parent fallback
//! - The request model ([`Request`]), built on the `http` crate's method,
//!   header and status types (re-exported here)
//! - The write-once-observable response sink ([`ResponseSink`]) and the
//!   transport-facing [`ResponseWriter`] trait
//! - Handler return values and the pluggable [`ReturnHandler`] that turns them
//!   into bytes on the response
//! - The error taxonomy used throughout the framework
//!
//! Nothing here knows about handler chains or routing; those live in
//! `mortar-framework`.

pub mod error;
pub mod inject;
pub mod mode;
pub mod reply;
pub mod request;
pub mod response;

pub use error::{
    BoxError, ChainError, ChainResult, ConfigResult, ConfigurationError, ResolveError,
    ResolveResult,
};
pub use inject::{Dep, FromInjector, Injectable, Injector};
pub use mode::Mode;
pub use reply::{
    DefaultReturnHandler, IntoReturnValues, Json, ReturnHandler, ReturnValue, ReturnValues,
    Status,
};
pub use request::Request;
pub use response::{BufferedResponse, ResponseSink, ResponseWriter};

pub use http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
