//! Route table and dispatch.
//!
//! Patterns are tried in the order they were first registered; the first
//! pattern that fits the path *and* has a handler for the method wins. So
//! with both `/users/:id` and `/users/new` registered, whichever came first
//! answers `/users/new`. Register literals before parameters when they
//! overlap.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use http::StatusCode;
use tracing::debug;

use crate::context::{self, RequestContext};
use crate::group::Group;
use crate::handler::{Handler, Next};
use crate::method::Method;
use crate::middleware::{Layer, Middleware, compose};
use crate::path::{Params, Pattern};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// One pattern and the handlers registered under it, per method.
struct Route {
    pattern: Pattern,
    handlers: HashMap<Method, Next>,
}

/// The application router.
///
/// Build it once at startup, then share it (`Arc<Router>`) with whatever
/// drives requests. Registration takes `self` by value and dispatch takes
/// `&self`, so a router can't change while it is serving.
///
/// ```rust
/// use switchyard::middleware::{Logger, Recovery};
/// use switchyard::{Request, Router};
///
/// async fn hello(req: Request) -> String {
///     format!("Hello, {}", req.param("name"))
/// }
///
/// let app = Router::new()
///     .middleware(Recovery)
///     .middleware(Logger)
///     .group("/api", |api| api.get("/hello/:name", hello));
/// ```
pub struct Router {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
    layers: Vec<Layer>,
    fallback: Next,
    /// `fallback` under the global layers, composed on the first miss.
    miss: OnceLock<Next>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            index: HashMap::new(),
            layers: Vec::new(),
            fallback: Next::new(not_found),
            miss: OnceLock::new(),
        }
    }

    /// Appends a global middleware. It wraps routes registered *after* this
    /// call, outside any group middleware, and the not-found fallback.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self.miss.take();
        self
    }

    /// Registers a handler for a method + pattern pair. Returns `self` for
    /// chaining. Registering the same pair again replaces the handler.
    ///
    /// Parameters use `:name` segments; `req.param("name")` retrieves them.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.register(method, pattern, &[], handler.into_next());
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    /// Registers routes under `prefix`. The closure gets a [`Group`] that
    /// owns the router until it returns.
    ///
    /// The prefix is prepended verbatim: `"/api/"` and `"/x"` give `"/api//x"`.
    pub fn group(self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        build(Group::new(self, prefix.to_owned(), Vec::new())).into_router()
    }

    /// Replaces the `404 page not found` answer for unmatched requests.
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        self.fallback = handler.into_next();
        self.miss.take();
        self
    }

    pub(crate) fn register(&mut self, method: Method, pattern: &str, group: &[Layer], handler: Next) {
        let chain = compose(self.layers.iter().chain(group), guard(handler));

        let fresh = self.routes.len();
        let slot = *self.index.entry(pattern.to_owned()).or_insert(fresh);
        if slot == fresh {
            self.routes.push(Route { pattern: Pattern::parse(pattern), handlers: HashMap::new() });
        }

        if self.routes[slot].handlers.insert(method, chain).is_some() {
            debug!(%method, pattern, "route handler replaced");
        } else {
            debug!(%method, pattern, layers = self.layers.len() + group.len(), "route registered");
        }
    }

    /// Finds the chain for `method` + `path`, the pattern that matched and the
    /// parameters it binds.
    pub(crate) fn lookup(&self, method: &str, path: &str) -> Option<(&Next, &Pattern, Params)> {
        let Ok(method) = method.parse::<Method>() else {
            debug!(method, path, "unknown method");
            return None;
        };
        let parts: Vec<&str> = path.split('/').collect();
        for route in &self.routes {
            let Some(params) = route.pattern.match_segments(&parts) else {
                continue;
            };
            match route.handlers.get(&method) {
                Some(chain) => return Some((chain, &route.pattern, params)),
                None => debug!(%method, path, pattern = %route.pattern, "pattern matches, method not registered"),
            }
        }
        None
    }

    /// Dispatches one request.
    ///
    /// Resolves the route, attaches a fresh [`RequestContext`] to `req` and
    /// runs the route's chain. Unmatched requests run the fallback under the
    /// global middleware. Resolves once the response is complete; the
    /// context is dropped with the request before this returns.
    pub async fn dispatch(&self, method: &str, path: &str, mut req: Request) -> Response {
        let (chain, ctx) = match self.lookup(method, path) {
            Some((chain, pattern, params)) => (
                chain.clone(),
                RequestContext::new(params).routed(method, path, Some(pattern.as_str())),
            ),
            None => {
                debug!(method, path, "no route");
                let chain = self
                    .miss
                    .get_or_init(|| compose(&self.layers, self.fallback.clone()))
                    .clone();
                (chain, RequestContext::default().routed(method, path, None))
            }
        };
        if context::attach(req.extensions_mut(), ctx) {
            debug!(method, path, "replaced a stale request context");
        }
        chain.run(req).await
    }

    /// Dispatches on the request's own method and path.
    pub async fn handle(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.path().to_owned();
        self.dispatch(method.as_str(), &path, req).await
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

async fn not_found(_req: Request) -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found")
}

/// Innermost layer of every route: refuses to run the handler without a
/// context to read from.
fn guard(handler: Next) -> Next {
    Next::new(move |req: Request| {
        let handler = handler.clone();
        async move {
            if let Err(e) = req.context() {
                return e.into_response();
            }
            handler.run(req).await
        }
    })
}
