//! Panic recovery.
//!
//! Install it first so it is the outermost layer; it only sees panics raised
//! by layers inside it.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::error;

use crate::handler::Next;
use crate::request::Request;
use crate::response::Response;

use super::Middleware;

/// Converts a panic anywhere in the inner chain into `500 Internal Server Error`.
///
/// The panicking request's state is dropped with its unwound future; other
/// in-flight requests never share it, so they are unaffected.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recovery;

impl Middleware for Recovery {
    fn wrap(&self, next: Next) -> Next {
        Next::new(move |req: Request| {
            let next = next.clone();
            async move {
                let method = req.method().clone();
                let path = req.path().to_owned();
                // The inner call happens inside the guarded future, so a panic
                // before the first await is caught too.
                let guarded = AssertUnwindSafe(async move { next.run(req).await });
                match guarded.catch_unwind().await {
                    Ok(res) => res,
                    Err(payload) => {
                        error!(%method, path, panic = panic_message(&*payload), "handler panicked");
                        Response::internal_error()
                    }
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
