//! # switchyard
//!
//! An embeddable HTTP request router. It maps method + path to a handler,
//! extracts path parameters, and wraps handlers in composable middleware.
//!
//! ## The contract
//!
//! switchyard dispatches. It does not own sockets: the host hands it a
//! [`Request`] and writes the [`Response`] it gets back. [`Server`] is a
//! small hyper host for when you don't have one.
//!
//! - **Routing**: `:name` parameter segments, exact segment counts, patterns
//!   tried in registration order
//! - **Middleware**: global and per-group decorators, composed into each
//!   route when it is registered
//! - **Context**: one [`RequestContext`] per dispatch, carried in the
//!   request's extensions, readable from any layer
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use switchyard::middleware::{Logger, Recovery};
//! use switchyard::{Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchyard::Error> {
//!     let app = Router::new()
//!         .middleware(Recovery)
//!         .middleware(Logger)
//!         .group("/api", |api| api.get("/hello/:name", hello));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn hello(req: Request) -> String {
//!     format!("Hello, {}", req.param("name"))
//! }
//! ```

mod error;
mod group;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod context;
pub mod middleware;
pub mod path;

pub use context::RequestContext;
pub use error::Error;
pub use group::Group;
pub use handler::{BoxFuture, Handler, Next};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
