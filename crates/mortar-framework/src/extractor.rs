//! Extractor system.
//!
//! The [`FromContext`] trait defines how a handler parameter is produced from
//! the request [`Context`]. Built-in extractors:
//!
//! | Parameter | Source |
//! |-----------|--------|
//! | [`Dep<T>`] | the value bound for `T` in the request registry or its parents |
//! | [`Option<T>`] | `T` if it can be extracted, `None` otherwise; never fails |
//! | [`Next`] | the continuation of the chain |
//! | [`Params`] | route parameters matched for this request |
//! | `Arc<Context>` | the request context itself |
//!
//! The request and response are bound in every request registry, so
//! `Dep<Request>` and `Dep<ResponseSink>` always resolve.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::Context;
use crate::router::Params;
use mortar_core::{ChainResult, Dep};

/// A trait for types that can be extracted from a [`Context`].
///
/// # Example
///
/// ```rust,ignore
/// struct UserAgent(String);
///
/// impl FromContext for UserAgent {
///     fn from_context(ctx: &Arc<Context>) -> ChainResult<Self> {
///         let agent = ctx.request().header("User-Agent").unwrap_or_default();
///         Ok(UserAgent(agent.to_string()))
///     }
/// }
/// ```
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<Context>) -> ChainResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> FromContext for Dep<T> {
    fn from_context(ctx: &Arc<Context>) -> ChainResult<Self> {
        Ok(Dep(ctx.resolve::<T>()?))
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<Context>) -> ChainResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

impl FromContext for Arc<Context> {
    fn from_context(ctx: &Arc<Context>) -> ChainResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

impl FromContext for Params {
    fn from_context(ctx: &Arc<Context>) -> ChainResult<Self> {
        Ok(ctx.params().clone())
    }
}

/// The continuation of the handler chain.
///
/// Awaiting [`run`](Next::run) executes every downstream handler, including
/// the terminal action, before returning. Code placed after it therefore runs
/// once the rest of the chain has finished.
///
/// ```rust,ignore
/// async fn around(next: Next) -> ChainResult<()> {
///     info!("before");
///     next.run().await?;
///     info!("after");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Next {
    ctx: Arc<Context>,
}

impl Next {
    /// Runs the remainder of the chain.
    pub fn run(&self) -> BoxFuture<'static, ChainResult<()>> {
        self.ctx.next()
    }
}

impl FromContext for Next {
    fn from_context(ctx: &Arc<Context>) -> ChainResult<Self> {
        Ok(Next {
            ctx: Arc::clone(ctx),
        })
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.ctx.index())
            .finish()
    }
}
