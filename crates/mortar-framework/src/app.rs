//! The application: registry, middleware, routes and terminal action.
//!
//! An [`Application`] is built once at startup and then only read while
//! serving. Every call to [`Application::serve`] composes the middleware
//! stack with the chain of the matched route (or the not-found chain), wraps
//! the request in a fresh [`Context`] whose registry is a child of the
//! application registry, and runs it.
//!
//! ```rust,ignore
//! let mut app = Application::classic();
//! app.bind(Database::connect()?);
//! app.router().get("/users/:id", chain![show_user])?;
//!
//! let response = BufferedResponse::new();
//! app.serve(Request::get("/users/7"), response.clone()).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Instrument, debug, error, info_span};

use crate::context::Context;
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::middleware::{logger, recovery, static_files};
use crate::router::Router;
use crate::service::AppService;
use mortar_core::{
    ChainResult, DefaultReturnHandler, Injectable, Injector, Request, ResolveResult,
    ResponseWriter, ReturnHandler,
};

/// Directory served by [`Application::classic`].
pub const DEFAULT_STATIC_DIR: &str = "public";

/// The request-dispatch application.
pub struct Application {
    injector: Arc<Injector>,
    handlers: Vec<BoxedHandler>,
    action: BoxedHandler,
    router: Router,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    /// Creates a bare application with the default return handler bound and
    /// no middleware.
    pub fn new() -> Self {
        let mut injector = Injector::new();
        injector.bind_as::<dyn ReturnHandler>(DefaultReturnHandler::shared());

        Self {
            injector: Arc::new(injector),
            handlers: Vec::new(),
            action: into_handler(|| async {}),
            router: Router::new(),
        }
    }

    /// Creates an application with `logger`, `recovery` and static file
    /// serving from `public`.
    pub fn classic() -> Self {
        Self::classic_with_static(DEFAULT_STATIC_DIR)
    }

    /// Like [`classic`](Self::classic), serving static files from `directory`.
    pub fn classic_with_static(directory: impl Into<PathBuf>) -> Self {
        let mut app = Self::new();
        app.use_handler(logger)
            .use_handler(recovery)
            .use_handler(static_files(directory.into()));
        app
    }

    // ─── Registry ─────────────────────────────────────────────────────────────

    /// Binds `value` in the application registry.
    pub fn bind<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        Arc::make_mut(&mut self.injector).bind(value);
        self
    }

    /// Binds `value` under `T` in the application registry.
    pub fn bind_as<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        Arc::make_mut(&mut self.injector).bind_as::<T>(value);
        self
    }

    /// Calls `f` with its parameters resolved from the application registry.
    pub fn invoke<F, Args>(&self, f: F) -> ResolveResult<F::Output>
    where
        F: Injectable<Args>,
    {
        self.injector.invoke(f)
    }

    pub fn injector(&self) -> &Arc<Injector> {
        &self.injector
    }

    // ─── Chain ────────────────────────────────────────────────────────────────

    /// Appends a middleware handler, run before every route chain.
    pub fn use_handler<H, T>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.handlers.push(into_handler(handler));
        self
    }

    /// Replaces the whole middleware stack.
    pub fn set_handlers(&mut self, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.handlers = handlers;
        self
    }

    /// Sets the terminal action, run once after a chain that did not write.
    pub fn action<H, T>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.action = into_handler(handler);
        self
    }

    /// Number of middleware handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    // ─── Routing ──────────────────────────────────────────────────────────────

    /// The route table, for registering routes and groups.
    pub fn router(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Replaces the chain used when no route matches.
    pub fn not_found(&mut self, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.router.not_found(handlers);
        self
    }

    // ─── Serving ──────────────────────────────────────────────────────────────

    /// Serves one request.
    ///
    /// Errors that no middleware intercepted are logged and returned; they
    /// only affect this request.
    pub async fn serve<W>(&self, request: Request, writer: W) -> ChainResult<()>
    where
        W: ResponseWriter + 'static,
    {
        let method = request.method().clone();
        let path = request.path().to_string();
        let (endpoint, params) = self.router.lookup(&method, &path);

        let mut handlers = Vec::with_capacity(self.handlers.len() + endpoint.len());
        handlers.extend(self.handlers.iter().cloned());
        handlers.extend(endpoint.iter().cloned());
        debug!(%method, path = %path, handlers = handlers.len(), "Dispatching request");

        let ctx = Context::new(
            Arc::clone(&self.injector),
            request,
            Box::new(writer),
            handlers,
            Arc::clone(&self.action),
            params,
        );

        let span = info_span!("request", %method, path = %path);
        let result = ctx.run().instrument(span).await;
        if let Err(err) = &result {
            error!(%method, path = %path, error = %err, "Request failed");
        }
        result
    }

    /// Converts the application into a `tower::Service`.
    pub fn into_service(self) -> AppService {
        AppService::new(Arc::new(self))
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("injector", &self.injector)
            .field("handlers", &self.handlers.len())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain;
    use crate::extractor::Next;
    use crate::router::Params;
    use http::StatusCode;
    use mortar_core::{BufferedResponse, ChainError, Dep, Mode};
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Greeting {
        word: &'static str,
    }

    async fn hello() -> &'static str {
        "hi"
    }

    async fn boom() -> &'static str {
        panic!("kaboom")
    }

    async fn get(app: &Application, target: &str) -> (ChainResult<()>, BufferedResponse) {
        let buffer = BufferedResponse::new();
        let result = app.serve(Request::get(target), buffer.clone()).await;
        (result, buffer)
    }

    #[tokio::test]
    async fn test_classic_app_serves_route() {
        let mut app = Application::classic();
        app.router().get("/hello", chain![hello]).unwrap();

        let (result, buffer) = get(&app, "/hello").await;
        result.unwrap();
        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.body_text(), "hi");
    }

    #[tokio::test]
    async fn test_classic_app_runs_not_found_chain() {
        let log = Log::default();
        let mut app = Application::classic();
        app.router().get("/hello", chain![hello]).unwrap();
        let seen = Arc::clone(&log);
        app.not_found(chain![move |request: Dep<Request>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(request.path().to_string());
                (StatusCode::NOT_FOUND, "gone")
            }
        }]);

        let (result, buffer) = get(&app, "/missing").await;
        result.unwrap();
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(buffer.body_text(), "gone");
        assert_eq!(*log.lock(), vec!["/missing".to_string()]);
    }

    #[tokio::test]
    async fn test_default_not_found_response() {
        let app = Application::new();
        let (result, buffer) = get(&app, "/nowhere").await;
        result.unwrap();
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(buffer.body_text(), "404 page not found");
    }

    #[tokio::test]
    async fn test_middleware_wraps_route_chain() {
        let log = Log::default();
        let mut app = Application::new();
        let seen = Arc::clone(&log);
        app.use_handler(move |next: Next| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push("before".into());
                next.run().await?;
                seen.lock().push("after".into());
                Ok::<_, ChainError>(())
            }
        });
        let seen = Arc::clone(&log);
        app.router()
            .get(
                "/wrap",
                chain![move || {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().push("route".into());
                    }
                }],
            )
            .unwrap();
        let seen = Arc::clone(&log);
        app.action(move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push("action".into());
            }
        });

        assert_eq!(app.handler_count(), 1);

        let (result, buffer) = get(&app, "/wrap").await;
        result.unwrap();
        assert_eq!(*log.lock(), vec!["before", "route", "action", "after"]);
        assert_eq!(buffer.status(), None);
    }

    #[tokio::test]
    async fn test_app_bindings_and_params_reach_handlers() {
        let mut app = Application::new();
        app.bind(Greeting { word: "hello" });
        app.router()
            .get(
                "/greet/:name",
                chain![|greeting: Dep<Greeting>, params: Params| async move {
                    format!("{} {}", greeting.word, params.get("name").unwrap_or_default())
                }],
            )
            .unwrap();

        let (result, buffer) = get(&app, "/greet/ada").await;
        result.unwrap();
        assert_eq!(buffer.body_text(), "hello ada");
        assert_eq!(
            buffer.header("Content-Type").as_deref(),
            Some("text/plain; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn test_unresolved_dependency_fails_only_this_request() {
        let mut app = Application::new();
        app.router()
            .get("/broken", chain![|_: Dep<Greeting>| async {}])
            .unwrap()
            .get("/fine", chain![hello])
            .unwrap();

        let (result, buffer) = get(&app, "/broken").await;
        assert!(matches!(result, Err(ChainError::Resolve(_))));
        assert_eq!(buffer.status(), None);

        let (result, buffer) = get(&app, "/fine").await;
        result.unwrap();
        assert_eq!(buffer.body_text(), "hi");
    }

    #[tokio::test]
    async fn test_classic_recovers_from_panicking_route() {
        let mut app = Application::classic();
        app.bind(Mode::Production);
        app.router()
            .get("/boom", chain![boom])
            .unwrap();

        let (result, buffer) = get(&app, "/boom").await;
        result.unwrap();
        assert_eq!(buffer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!buffer.body_text().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_the_app() {
        let mut app = Application::new();
        app.router()
            .get(
                "/echo/:value",
                chain![|params: Params| async move {
                    params.get("value").unwrap_or_default().to_string()
                }],
            )
            .unwrap();

        let responses = futures::future::join_all(
            (0..8).map(|i| {
                let app = &app;
                async move { get(app, &format!("/echo/{i}")).await }
            }),
        )
        .await;

        for (i, (result, buffer)) in responses.into_iter().enumerate() {
            result.unwrap();
            assert_eq!(buffer.body_text(), i.to_string());
        }
    }

    #[test]
    fn test_invoke_uses_application_registry() {
        let mut app = Application::new();
        app.bind(Greeting { word: "hey" });
        let value = app.invoke(|greeting: Dep<Greeting>| greeting.word).unwrap();
        assert_eq!(value, "hey");
    }
}
