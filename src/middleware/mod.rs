//! Middleware layer.
//!
//! A middleware is a decorator: it receives the [`Next`] it wraps and returns
//! a new `Next`. Inside, it can inspect or modify the request, answer on its
//! own without calling inward (rejections, CORS preflight), or call inward and
//! post-process the response.
//!
//! ```rust
//! use switchyard::middleware::from_fn;
//! use switchyard::{Next, Request, Router};
//!
//! let app = Router::new()
//!     .middleware(from_fn(|req: Request, next: Next| async move {
//!         let mut res = next.run(req).await;
//!         res.headers_mut().insert("x-served-by", "switchyard".parse().unwrap());
//!         res
//!     }))
//!     // a bare `Fn(Next) -> Next` is a middleware too
//!     .middleware(|next: Next| next);
//! ```
//!
//! # Ordering
//!
//! `middleware(a).middleware(b)` runs `a` before `b` on the way in and `b`
//! before `a` on the way out: the first registered layer is the outermost.
//! Layers are composed into each route when the route is registered, so a
//! layer added later never reaches routes registered before it.

use std::future::Future;
use std::sync::Arc;

use crate::handler::Next;
use crate::request::Request;
use crate::response::IntoResponse;

pub mod auth;
pub mod content_type;
pub mod cors;
pub mod logger;
pub mod rate_limit;
pub mod recovery;

pub use auth::{Claims, JwtAuth, JwtConfig, TokenSource};
pub use content_type::AllowedContentType;
pub use cors::{Cors, CorsConfig};
pub use logger::Logger;
pub use rate_limit::{RateLimit, RateLimitConfig, RateLimitStore};
pub use recovery::Recovery;

/// A decorator over a terminal handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: Next) -> Next;
}

impl<F> Middleware for F
where
    F: Fn(Next) -> Next + Send + Sync + 'static,
{
    fn wrap(&self, next: Next) -> Next {
        self(next)
    }
}

/// A shared, type-erased middleware as stored by routers and groups.
pub(crate) type Layer = Arc<dyn Middleware>;

/// Folds `layers` around `terminal`, first layer outermost.
pub(crate) fn compose<'a, I>(layers: I, terminal: Next) -> Next
where
    I: IntoIterator<Item = &'a Layer>,
    I::IntoIter: DoubleEndedIterator,
{
    layers.into_iter().rev().fold(terminal, |next, layer| layer.wrap(next))
}

/// Builds a middleware from an async function of the request and the rest of
/// the chain.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: Next) -> Next {
        let f = Arc::clone(&self.0);
        Next::new(move |req: Request| (*f)(req, next.clone()))
    }
}
