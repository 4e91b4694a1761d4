//! Prefixed route groups.

use std::sync::Arc;

use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::{Layer, Middleware};
use crate::router::Router;

/// Registers routes on a [`Router`] under a shared prefix and middleware.
///
/// Obtained from [`Router::group`] or [`Group::group`]. A group owns no
/// routes: it forwards each registration to the router with its prefix
/// prepended and its middleware layered inside the router's.
///
/// ```rust
/// use switchyard::middleware::Logger;
/// use switchyard::{Request, Router};
///
/// # async fn list(_: Request) -> &'static str { "" }
/// # async fn show(_: Request) -> &'static str { "" }
/// let app = Router::new().group("/api", |api| {
///     api.middleware(Logger)
///         .get("/users", list)
///         .group("/v2", |v2| v2.get("/users/:id", show))
/// });
/// ```
pub struct Group {
    router: Router,
    prefix: String,
    layers: Vec<Layer>,
}

impl Group {
    pub(crate) fn new(router: Router, prefix: String, layers: Vec<Layer>) -> Self {
        Self { router, prefix, layers }
    }

    pub(crate) fn into_router(self) -> Router {
        self.router
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Appends group middleware. Like router middleware, it only wraps routes
    /// registered after this call.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        let full = format!("{}{pattern}", self.prefix);
        self.router.register(method, &full, &self.layers, handler.into_next());
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

    /// Nests a group. Prefixes concatenate; the nested group starts with this
    /// group's current middleware.
    pub fn group(self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        let Group { router, prefix: outer, layers } = self;
        let nested = build(Group::new(router, format!("{outer}{prefix}"), layers.clone()));
        Group { router: nested.router, prefix: outer, layers }
    }
}
