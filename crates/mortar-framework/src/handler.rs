//! Handler system.
//!
//! A handler is any async function or closure whose parameters implement
//! [`FromContext`] and whose output implements [`IntoReturnValues`]. The
//! [`Handler`] trait is implemented for such functions through blanket impls,
//! one per arity, similar to Axum's handler system.
//!
//! ```rust,ignore
//! // No parameters, text response
//! async fn hello() -> &'static str {
//!     "hi"
//! }
//!
//! // Registry-backed parameters
//! async fn show(db: Dep<Database>, params: Params) -> Result<Json<User>, DbError> {
//!     Ok(Json(db.user(params.get("id").unwrap_or_default())?))
//! }
//!
//! // Around middleware
//! async fn timing(next: Next) -> ChainResult<()> {
//!     let start = Instant::now();
//!     next.run().await?;
//!     debug!(elapsed = ?start.elapsed());
//!     Ok(())
//! }
//! ```
//!
//! Every parameter is extracted before the function body runs. If one of them
//! fails the handler is not called and the chain aborts with
//! [`ChainError::Resolve`](mortar_core::ChainError::Resolve).

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::extractor::FromContext;
use mortar_core::{ChainResult, IntoReturnValues, ReturnValues};

/// The future returned by a type-erased handler.
pub type HandlerFuture = BoxFuture<'static, ChainResult<ReturnValues>>;

/// The core trait for request handlers.
///
/// `T` is a marker for the parameter list; it lets one function type
/// implement `Handler` exactly once without overlapping impls.
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Extracts the parameters from `ctx`, calls the handler and converts its
    /// output into return values.
    fn call(self, ctx: Arc<Context>) -> HandlerFuture;
}

// ============================================================================
// BoxedHandler - Type-erased handler stored in chains
// ============================================================================

/// A type-erased handler that can be stored in a chain.
pub type BoxedHandler = Arc<dyn Fn(Arc<Context>) -> HandlerFuture + Send + Sync>;

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<H, T>(handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    Arc::new(move |ctx| handler.clone().call(ctx))
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoReturnValues + Send + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            fn call(self, ctx: Arc<Context>) -> HandlerFuture {
                async move {
                    $(
                        let $ty = $ty::from_context(&ctx)?;
                    )*
                    (self)($($ty,)*).await.into_return_values()
                }
                .boxed()
            }
        }
    };
}

// Generate implementations for 0-12 parameters
impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
