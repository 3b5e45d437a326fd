//! Routing.
//!
//! [`Router`] keeps a stack of groups. Every group contributes a path prefix
//! and a list of handlers; a route registered inside nested groups gets the
//! concatenation of all enclosing prefixes followed by its own pattern, and
//! the enclosing handlers (outermost first) followed by its own handlers.
//!
//! ```rust,ignore
//! router.group("/api", chain![auth], |api| {
//!     api.group("/v1", chain![audit], |v1| {
//!         // GET /api/v1/users runs auth, audit, list_users
//!         v1.get("/users", chain![list_users])?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! ```
//!
//! Prefixes are joined verbatim: no separator is inserted and empty patterns
//! are allowed on either side.

mod matcher;

pub use matcher::{Endpoint, Params, PathMatcher, SegmentMatcher};

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::debug;

use crate::handler::{BoxedHandler, into_handler};
use http::{Method, StatusCode};
use mortar_core::ConfigResult;

/// A pushed group: its prefix and the handlers it adds to every route.
struct Group {
    pattern: String,
    handlers: Vec<BoxedHandler>,
}

/// Route table with nested group support.
pub struct Router {
    matcher: Box<dyn PathMatcher>,
    groups: Vec<Group>,
    not_found: Endpoint,
}

/// Methods [`Router::any`] registers a route for.
pub const ANY_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
];

async fn default_not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found")
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! method_routes {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, pattern: &str, handlers: Vec<BoxedHandler>) -> ConfigResult<&mut Self> {
                self.route($method, pattern, handlers)
            }
        )*
    };
}

impl Router {
    /// Creates a router backed by a [`SegmentMatcher`].
    pub fn new() -> Self {
        Self::with_matcher(SegmentMatcher::new())
    }

    /// Creates a router backed by a custom [`PathMatcher`].
    pub fn with_matcher(matcher: impl PathMatcher + 'static) -> Self {
        Self {
            matcher: Box::new(matcher),
            groups: Vec::new(),
            not_found: Arc::from(vec![into_handler(default_not_found)]),
        }
    }

    /// Registers `handlers` for `method` and `pattern`, inside every group
    /// currently open.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> ConfigResult<&mut Self> {
        let (pattern, chain) = self.compose(pattern, handlers);
        debug!(%method, pattern = %pattern, handlers = chain.len(), "Registering route");
        self.matcher.insert(method, &pattern, Arc::from(chain))?;
        Ok(self)
    }

    /// Registers the same chain for every method in [`ANY_METHODS`].
    pub fn any(&mut self, pattern: &str, handlers: Vec<BoxedHandler>) -> ConfigResult<&mut Self> {
        for method in ANY_METHODS {
            self.route(method, pattern, handlers.clone())?;
        }
        Ok(self)
    }

    method_routes! {
        get => Method::GET;
        post => Method::POST;
        put => Method::PUT;
        patch => Method::PATCH;
        delete => Method::DELETE;
        options => Method::OPTIONS;
        head => Method::HEAD;
    }

    /// Opens a group for the duration of `register`.
    ///
    /// The group is closed again when `register` returns, whether it succeeds,
    /// fails or panics.
    pub fn group<F>(
        &mut self,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
        register: F,
    ) -> ConfigResult<&mut Self>
    where
        F: FnOnce(&mut Router) -> ConfigResult<()>,
    {
        let mut scope = GroupScope::enter(
            self,
            Group {
                pattern: pattern.to_string(),
                handlers,
            },
        );
        register(&mut *scope)?;
        drop(scope);
        Ok(self)
    }

    /// Replaces the chain used when no route matches.
    ///
    /// Handlers of any group currently open are prepended, so calling this
    /// inside a group behaves like registering a route there.
    pub fn not_found(&mut self, handlers: Vec<BoxedHandler>) -> &mut Self {
        let (_, chain) = self.compose("", handlers);
        self.not_found = Arc::from(chain);
        self
    }

    /// Number of groups currently open.
    pub fn group_depth(&self) -> usize {
        self.groups.len()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    /// Finds the endpoint registered for `method` and `path`.
    pub fn find(&self, method: &Method, path: &str) -> Option<(Endpoint, Params)> {
        self.matcher.find(method, path)
    }

    /// Like [`find`](Self::find), falling back to the not-found chain.
    pub fn lookup(&self, method: &Method, path: &str) -> (Endpoint, Params) {
        self.find(method, path)
            .unwrap_or_else(|| (Arc::clone(&self.not_found), Params::default()))
    }

    fn compose(&self, pattern: &str, handlers: Vec<BoxedHandler>) -> (String, Vec<BoxedHandler>) {
        let mut full = String::new();
        let mut chain = Vec::new();
        for group in &self.groups {
            full.push_str(&group.pattern);
            chain.extend(group.handlers.iter().cloned());
        }
        full.push_str(pattern);
        chain.extend(handlers);
        (full, chain)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.len())
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

/// Pops its group when dropped.
struct GroupScope<'a> {
    router: &'a mut Router,
}

impl<'a> GroupScope<'a> {
    fn enter(router: &'a mut Router, group: Group) -> Self {
        router.groups.push(group);
        Self { router }
    }
}

impl Deref for GroupScope<'_> {
    type Target = Router;

    fn deref(&self) -> &Router {
        self.router
    }
}

impl DerefMut for GroupScope<'_> {
    fn deref_mut(&mut self) -> &mut Router {
        self.router
    }
}

impl Drop for GroupScope<'_> {
    fn drop(&mut self) {
        self.router.groups.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain;
    use crate::context::Context;
    use mortar_core::{
        BufferedResponse, ConfigurationError, DefaultReturnHandler, Injector, Request,
        ReturnHandler,
    };
    use parking_lot::Mutex;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn record(log: &Log, label: &'static str) -> BoxedHandler {
        let log = Arc::clone(log);
        into_handler(move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(label);
            }
        })
    }

    async fn run(endpoint: Endpoint, params: Params) -> BufferedResponse {
        let mut injector = Injector::new();
        injector.bind_as::<dyn ReturnHandler>(DefaultReturnHandler::shared());
        let buffer = BufferedResponse::new();
        let ctx = Context::new(
            Arc::new(injector),
            Request::get("/"),
            Box::new(buffer.clone()),
            endpoint.to_vec(),
            into_handler(|| async {}),
            params,
        );
        ctx.run().await.unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_nested_groups_compose_prefix_and_chain() {
        let log = Log::default();
        let mut router = Router::new();
        router
            .group("/api", vec![record(&log, "g1")], |api| {
                api.group("/a", vec![record(&log, "g2")], |a| {
                    a.get("/b", vec![record(&log, "r1")])?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        assert_eq!(router.group_depth(), 0);
        assert!(router.find(&Method::GET, "/api/a").is_none());

        let (endpoint, params) = router.find(&Method::GET, "/api/a/b").unwrap();
        assert_eq!(endpoint.len(), 3);
        run(endpoint, params).await;
        assert_eq!(*log.lock(), vec!["g1", "g2", "r1"]);
    }

    #[test]
    fn test_empty_patterns_concatenate() {
        let mut router = Router::new();
        router
            .group("", vec![], |r| {
                r.get("/x", vec![])?;
                Ok(())
            })
            .unwrap()
            .group("/api", vec![], |r| {
                r.get("", vec![])?;
                Ok(())
            })
            .unwrap();

        assert!(router.find(&Method::GET, "/x").is_some());
        assert!(router.find(&Method::GET, "/api").is_some());
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_group_closed_after_error() {
        let mut router = Router::new();
        let result = router.group("/g", vec![], |r| {
            r.get("/ok", vec![])?;
            r.get("/ok", vec![])?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicateRoute { ref method, ref pattern })
                if method == Method::GET && pattern == "/g/ok"
        ));
        assert_eq!(router.group_depth(), 0);

        router.get("/after", vec![]).unwrap();
        assert!(router.find(&Method::GET, "/after").is_some());
        assert!(router.find(&Method::GET, "/g/after").is_none());
    }

    #[test]
    fn test_group_closed_after_panic() {
        let mut router = Router::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = router.group("/g", vec![], |_| panic!("registration failed"));
        }));

        assert!(outcome.is_err());
        assert_eq!(router.group_depth(), 0);
    }

    #[test]
    fn test_invalid_composed_pattern() {
        let mut router = Router::new();
        let err = router
            .group("api", vec![], |r| {
                r.get("/x", vec![])?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_any_registers_every_method() {
        let mut router = Router::new();
        router.any("/ping", vec![]).unwrap();
        for method in ANY_METHODS {
            assert!(router.find(&method, "/ping").is_some());
        }
        assert!(router.find(&Method::TRACE, "/ping").is_none());
        assert_eq!(router.len(), ANY_METHODS.len());
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let router = Router::new();
        let (endpoint, params) = router.lookup(&Method::GET, "/missing");
        let buffer = run(endpoint, params).await;
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(buffer.body_text(), "404 page not found");
    }

    #[tokio::test]
    async fn test_not_found_inside_group_takes_group_handlers() {
        let log = Log::default();
        let mut router = Router::new();
        router
            .group("/admin", vec![record(&log, "guard")], |r| {
                r.not_found(chain![|| async { (StatusCode::NOT_FOUND, "nothing here") }]);
                Ok(())
            })
            .unwrap();

        let (endpoint, params) = router.lookup(&Method::POST, "/anything");
        let buffer = run(endpoint, params).await;
        assert_eq!(*log.lock(), vec!["guard"]);
        assert_eq!(buffer.body_text(), "nothing here");
    }
}
