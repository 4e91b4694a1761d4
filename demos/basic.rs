//! Minimal switchyard example: a greeting API behind the bundled middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/hello/Ada
//!   curl -X POST http://localhost:3000/api/users -d '{"name":"grace"}'
//!   curl -X DELETE http://localhost:3000/api/users/42
//!   curl http://localhost:3000/api/panic
//!   for i in 1 2 3 4 5 6; do curl -s -o /dev/null -w '%{http_code}\n' http://localhost:3000/api/hello/x; done

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use serde::Serialize;
use switchyard::middleware::{
    AllowedContentType, Cors, CorsConfig, Logger, RateLimit, RateLimitConfig, RateLimitStore,
    Recovery,
};
use switchyard::{IntoResponse, Json, Request, Response, Router, Server};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct User {
    id: String,
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), switchyard::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let limits = RateLimitConfig {
        limit: 5,
        window: Duration::from_secs(10),
        ..RateLimitConfig::default()
    };

    let app = Router::new()
        .middleware(Recovery)
        .middleware(Logger)
        .middleware(Cors::new(CorsConfig {
            allowed_methods: vec!["GET".into(), "POST".into(), "DELETE".into()],
            ..CorsConfig::default()
        }))
        .group("/api", |api| {
            api.middleware(RateLimit::new(limits, Arc::new(RateLimitStore::new())))
                .middleware(AllowedContentType::new(["application/json"]))
                .get("/hello/:name", hello)
                .post("/users", create_user)
                .delete("/users/:id", delete_user)
                .get("/panic", panics)
        });

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /api/hello/:name
async fn hello(req: Request) -> String {
    format!("Hello, {}", req.param("name"))
}

// POST /api/users
//
// req.body() is the buffered body; parse it with serde_json::from_slice.
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    let user = User { id: "99".into(), name: "new_user".into() };
    let mut res = (StatusCode::CREATED, Json(user)).into_response();
    res.headers_mut().insert("location", http::HeaderValue::from_static("/api/users/99"));
    res
}

// DELETE /api/users/:id → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

// GET /api/panic → 500 from Recovery, the server keeps running
async fn panics(_req: Request) -> &'static str {
    panic!("demo panic")
}
