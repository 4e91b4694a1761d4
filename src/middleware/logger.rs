//! Request logging through `tracing`.

use std::time::Instant;

use tracing::{error, info};

use crate::handler::Next;
use crate::request::Request;

use super::Middleware;

/// Logs `started` on the way in and `completed` with status and latency on
/// the way out. Server errors are logged at `error`, everything else at `info`.
///
/// Method and path are the ones dispatch routed on, and `route` is the
/// pattern that matched (absent on a miss).
#[derive(Clone, Copy, Debug, Default)]
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: Next) -> Next {
        Next::new(move |req: Request| {
            let next = next.clone();
            async move {
                let (method, path, route) = match req.context() {
                    Ok(ctx) => (
                        ctx.method().to_owned(),
                        ctx.path().to_owned(),
                        ctx.pattern().map(str::to_owned),
                    ),
                    Err(_) => (req.method().to_string(), req.path().to_owned(), None),
                };
                let route = route.as_deref();
                let start = Instant::now();
                info!(method, path, route, "started");

                let res = next.run(req).await;

                let status = res.status_code().as_u16();
                let elapsed = start.elapsed();
                if res.status_code().is_server_error() {
                    error!(method, path, route, status, ?elapsed, "completed");
                } else {
                    info!(method, path, route, status, ?elapsed, "completed");
                }
                res
            }
        })
    }
}
