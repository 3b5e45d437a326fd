//! Request context and the handler-chain execution loop.
//!
//! One [`Context`] is created per request. It owns:
//!
//! - a child [`Injector`] whose parent is the application registry, with the
//!   [`Request`] and [`ResponseSink`] bound in it
//! - the composed handler chain and the terminal action
//! - a cursor into the chain
//! - the route parameters matched for the request
//!
//! # Execution
//!
//! The cursor `index` walks `0..=N`, where `N` is the number of chain
//! handlers. Positions `0..N` run chain handlers, position `N` runs the
//! terminal action, anything past `N` is terminal. [`Context::run`] invokes the
//! handler at the cursor, advances the cursor, hands any return values to the
//! registered [`ReturnHandler`], and stops as soon as the response has been
//! written.
//!
//! [`Context::next`] (usually reached through the [`Next`](crate::Next)
//! extractor) advances the cursor and runs the rest of the chain before
//! returning to its caller, which is what lets a handler wrap logic around
//! everything downstream of it.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::handler::BoxedHandler;
use crate::router::Params;
use mortar_core::{
    ChainError, ChainResult, Injector, Request, ResolveResult, ResponseSink, ResponseWriter,
    ReturnHandler,
};

/// The per-request execution context.
pub struct Context {
    /// Request-scoped registry. Copy-on-write so the return dispatcher can
    /// borrow a snapshot across an await point.
    injector: RwLock<Arc<Injector>>,
    handlers: Vec<BoxedHandler>,
    action: BoxedHandler,
    index: AtomicUsize,
    request: Arc<Request>,
    response: Arc<ResponseSink>,
    params: Params,
}

impl Context {
    /// Creates a context for one request.
    ///
    /// The request and a [`ResponseSink`] around `writer` are bound in a new
    /// registry whose parent is `parent`.
    pub fn new(
        parent: Arc<Injector>,
        request: Request,
        writer: Box<dyn ResponseWriter>,
        handlers: Vec<BoxedHandler>,
        action: BoxedHandler,
        params: Params,
    ) -> Arc<Self> {
        let request = Arc::new(request);
        let response = Arc::new(ResponseSink::new(writer));

        let mut injector = Injector::with_parent(parent);
        injector
            .bind_as::<Request>(Arc::clone(&request))
            .bind_as::<ResponseSink>(Arc::clone(&response));

        Arc::new(Self {
            injector: RwLock::new(Arc::new(injector)),
            handlers,
            action,
            index: AtomicUsize::new(0),
            request,
            response,
            params,
        })
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    /// The request being served.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The sink the response is written to.
    pub fn response(&self) -> &Arc<ResponseSink> {
        &self.response
    }

    /// Parameters matched by the route.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the route parameter `name`, or `""` if it was not matched.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or_default()
    }

    /// Returns `true` once the response has been written.
    pub fn written(&self) -> bool {
        self.response.written()
    }

    /// Current cursor position.
    pub fn index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Number of chain handlers, excluding the terminal action.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` once the cursor has moved past the terminal action.
    pub fn is_terminal(&self) -> bool {
        self.index() > self.handlers.len()
    }

    // ─── Request-scoped registry ──────────────────────────────────────────────

    /// Resolves `T` from the request registry or its parents.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> ResolveResult<Arc<T>> {
        self.injector.read().resolve::<T>()
    }

    /// Binds `value` for the rest of this request.
    pub fn bind<T: Send + Sync + 'static>(&self, value: T) {
        Arc::make_mut(&mut *self.injector.write()).bind(value);
    }

    /// Binds `value` under `T` for the rest of this request.
    pub fn bind_as<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        Arc::make_mut(&mut *self.injector.write()).bind_as::<T>(value);
    }

    /// A snapshot of the request registry.
    pub fn injector(&self) -> Arc<Injector> {
        Arc::clone(&self.injector.read())
    }

    // ─── Execution ────────────────────────────────────────────────────────────

    /// Returns the handler at the cursor.
    ///
    /// Fails with [`ChainError::InvalidState`] once the cursor is terminal.
    pub fn handler(&self) -> ChainResult<BoxedHandler> {
        self.handler_at(self.index())
    }

    fn handler_at(&self, index: usize) -> ChainResult<BoxedHandler> {
        let len = self.handlers.len();
        match index.cmp(&len) {
            CmpOrdering::Less => Ok(Arc::clone(&self.handlers[index])),
            CmpOrdering::Equal => Ok(Arc::clone(&self.action)),
            CmpOrdering::Greater => Err(ChainError::InvalidState { index, len }),
        }
    }

    /// Runs the chain from the cursor until it is terminal or the response is
    /// written.
    ///
    /// Fails with [`ChainError::InvalidState`] if the cursor is already
    /// terminal.
    pub async fn run(self: Arc<Self>) -> ChainResult<()> {
        let len = self.handlers.len();
        let index = self.index();
        if index > len {
            return Err(ChainError::InvalidState { index, len });
        }
        self.run_loop().await
    }

    async fn run_loop(self: Arc<Self>) -> ChainResult<()> {
        let len = self.handlers.len();
        while self.index() <= len {
            let index = self.index();
            trace!(index, len, "Invoking handler");

            let handler = self.handler_at(index)?;
            let values = handler(Arc::clone(&self)).await?;
            self.index.fetch_add(1, Ordering::SeqCst);

            if !values.is_empty() {
                let dispatcher = self.resolve::<dyn ReturnHandler>()?;
                let injector = self.injector();
                dispatcher.handle_return(&injector, values).await?;
            }

            if self.written() {
                debug!(index, "Response written, halting chain");
                return Ok(());
            }
        }
        Ok(())
    }

    /// Advances the cursor and runs the rest of the chain.
    ///
    /// Returns once every downstream handler has finished. Calling this after
    /// the terminal action has already been passed fails with
    /// [`ChainError::InvalidState`].
    pub fn next(self: &Arc<Self>) -> BoxFuture<'static, ChainResult<()>> {
        let ctx = Arc::clone(self);
        async move {
            let len = ctx.handlers.len();
            let index = ctx.index();
            if index > len {
                return Err(ChainError::InvalidState { index, len });
            }
            ctx.index.fetch_add(1, Ordering::SeqCst);

            if ctx.written() {
                return Ok(());
            }
            ctx.run_loop().await
        }
        .boxed()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method())
            .field("path", &self.request.path())
            .field("index", &self.index())
            .field("handlers", &self.handlers.len())
            .field("written", &self.written())
            .finish_non_exhaustive()
    }
}
