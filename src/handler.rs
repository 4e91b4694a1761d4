//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The route table holds handlers of *different* types in one collection, so
//! each is hidden behind a trait object (`dyn Terminal`) and stored as
//! [`Next`]. Middleware composes over the same type: it takes a `Next` and
//! returns a `Next`, which is why a decorated handler and a bare one are
//! indistinguishable to the router.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_next()                                ← Handler blanket impl
//!        ↓
//! Next(Arc::new(FnTerminal(hello)))                ← heap-allocated wrapper
//!        ↓  middleware.wrap(next) → Next, bound at registration
//! next.run(req)  at request time                   ← one vtable call per layer
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
trait Terminal: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// A type-erased terminal: a handler, possibly already wrapped in middleware.
///
/// Cloning is one atomic increment. Middleware keeps the `Next` it was given
/// and calls [`Next::run`] when (and if) it wants the inner chain to run.
#[derive(Clone)]
pub struct Next(Arc<dyn Terminal>);

impl Next {
    pub fn new(handler: impl Handler) -> Self {
        handler.into_next()
    }

    /// Runs the inner chain. The future owns everything it needs.
    pub fn run(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Next")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// function or closure with the shape:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_next(self) -> Next;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_next(self) -> Next {
        Next(Arc::new(FnTerminal(self)))
    }
}

/// Bridges a concrete handler `F` into the trait-object world.
struct FnTerminal<F>(F);

impl<F, Fut, R> Terminal for FnTerminal<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
