mod common;

use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::StatusCode;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use switchyard::middleware::{
    AllowedContentType, Claims, Cors, CorsConfig, JwtAuth, JwtConfig, Logger, RateLimit,
    RateLimitConfig, RateLimitStore, Recovery, TokenSource,
};
use switchyard::middleware::from_fn;
use switchyard::{Next, Request, Response, Router};
use tracing_subscriber::fmt::MakeWriter;

use common::{body, from_peer, request, request_with};

const SECRET: &[u8] = b"correct horse battery staple";

async fn boom(_req: Request) -> &'static str {
    panic!("handler exploded")
}

fn boom_before_await(_req: Request) -> std::future::Ready<&'static str> {
    panic!("exploded while building the future")
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn token(claims: serde_json::Value, secret: &[u8]) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}

async fn whoami(req: Request) -> Result<String, switchyard::Error> {
    let ctx = req.context()?;
    let subject = ctx.claims::<Claims>().and_then(Claims::subject).unwrap_or("anonymous");
    Ok(subject.to_owned())
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ── Recovery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recovery_turns_panics_into_500() {
    let app = Router::new()
        .middleware(Recovery)
        .middleware(Logger)
        .get("/boom", boom)
        .get("/sync-boom", boom_before_await)
        .get("/fine", |_req: Request| async { "fine" });

    for path in ["/boom", "/sync-boom"] {
        let res = app.handle(request("GET", path)).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(body(&res), "Internal Server Error");
    }

    // The router is untouched by the unwound request.
    let res = app.handle(request("GET", "/fine")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn unrecovered_panic_stays_in_its_own_task() {
    let app = Arc::new(
        Router::new()
            .get("/boom", boom)
            .get("/fine", |_req: Request| async { "fine" }),
    );

    let crashed = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.handle(request("GET", "/boom")).await }
    })
    .await;
    assert!(crashed.unwrap_err().is_panic());

    let res = app.handle(request("GET", "/fine")).await;
    assert_eq!(body(&res), "fine");
}

// ── Logger ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn logger_names_the_dispatched_route() {
    let logs = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = Router::new()
        .middleware(Logger)
        .post("/items/:id", |_req: Request| async { "ok" });
    app.dispatch("POST", "/items/42", request("GET", "/elsewhere")).await;

    let out = logs.text();
    assert!(out.contains("started"), "{out}");
    assert!(out.contains("/items/42"), "{out}");
    assert!(out.contains("/items/:id"), "{out}");
    assert!(!out.contains("/elsewhere"), "{out}");
}

// ── Rate limiting ────────────────────────────────────────────────────────────

fn limited(store: Arc<RateLimitStore>) -> Router {
    let config = RateLimitConfig {
        limit: 2,
        window: Duration::from_secs(1),
        ..RateLimitConfig::default()
    };
    Router::new()
        .middleware(RateLimit::new(config, store))
        .get("/", |_req: Request| async { "ok" })
}

#[tokio::test(start_paused = true)]
async fn rate_limit_rejects_within_window_and_resets_after() {
    let store = Arc::new(RateLimitStore::new());
    let app = limited(Arc::clone(&store));
    let peer = "10.0.0.1:5000";

    for _ in 0..2 {
        let res = app.handle(from_peer("GET", "/", peer)).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    let res = app.handle(from_peer("GET", "/", peer)).await;
    assert_eq!(res.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body(&res), "429 - Too Many Requests");

    // Another client has its own budget; the port is not part of the key.
    let res = app.handle(from_peer("GET", "/", "10.0.0.2:5000")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let res = app.handle(from_peer("GET", "/", "10.0.0.1:6000")).await;
    assert_eq!(res.status_code(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::advance(Duration::from_millis(1001)).await;

    let res = app.handle(from_peer("GET", "/", peer)).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(store.count("10.0.0.1"), 1);
}

#[tokio::test(start_paused = true)]
async fn routers_with_separate_stores_do_not_share_counters() {
    let a = limited(Arc::new(RateLimitStore::new()));
    let b = limited(Arc::new(RateLimitStore::new()));

    for _ in 0..2 {
        a.handle(from_peer("GET", "/", "10.0.0.1:1")).await;
    }
    assert_eq!(a.handle(from_peer("GET", "/", "10.0.0.1:1")).await.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(b.handle(from_peer("GET", "/", "10.0.0.1:1")).await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_without_client_key_is_500() {
    let app = limited(Arc::new(RateLimitStore::new()));
    let res = app.handle(request("GET", "/")).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn rate_limit_custom_key_and_rejection() {
    let config = RateLimitConfig {
        limit: 1,
        window: Duration::from_secs(60),
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "slow down".to_owned(),
    };
    let limiter = RateLimit::new(config, Arc::new(RateLimitStore::new()))
        .key_by(|req: &Request| req.header("x-api-key").map(str::to_owned));
    let app = Router::new().middleware(limiter).get("/", |_req: Request| async { "ok" });

    let keyed = || request_with("GET", "/", &[("x-api-key", "k1")]);
    assert_eq!(app.handle(keyed()).await.status_code(), StatusCode::OK);

    let res = app.handle(keyed()).await;
    assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body(&res), "slow down");
}

// ── CORS ─────────────────────────────────────────────────────────────────────

fn cors_app() -> Router {
    Router::new()
        .middleware(Cors::new(CorsConfig {
            allowed_origins: vec!["https://app.example".into()],
            allowed_methods: vec!["GET".into(), "POST".into()],
            allowed_headers: vec!["content-type".into(), "authorization".into()],
            allow_credentials: true,
        }))
        .get("/data", |_req: Request| async { "data" })
}

#[tokio::test]
async fn cors_rejects_unknown_origins() {
    let res = cors_app()
        .handle(request_with("GET", "/data", &[("origin", "https://evil.example")]))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(body(&res), "Origin not allowed");
}

#[tokio::test]
async fn cors_decorates_allowed_responses() {
    let res = cors_app()
        .handle(request_with("GET", "/data", &[("origin", "https://app.example")]))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "data");
    assert_eq!(res.headers()["access-control-allow-origin"], "https://app.example");
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, POST");
    assert_eq!(res.headers()["access-control-allow-headers"], "content-type, authorization");
}

#[tokio::test]
async fn cors_answers_preflight_without_a_route() {
    let res = cors_app()
        .handle(request_with("OPTIONS", "/data", &[("origin", "https://app.example")]))
        .await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
    assert!(res.body().is_empty());
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, POST");
}

#[tokio::test]
async fn cors_without_origin_list_allows_everyone() {
    let app = Router::new()
        .middleware(Cors::new(CorsConfig::default()))
        .get("/", |_req: Request| async { "open" });
    let res = app.handle(request_with("GET", "/", &[("origin", "https://any.example")])).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "https://any.example");
    assert!(!res.headers().contains_key("access-control-allow-credentials"));
}

// ── JWT ──────────────────────────────────────────────────────────────────────

fn jwt_app(source: TokenSource) -> Router {
    Router::new()
        .middleware(JwtAuth::new(JwtConfig { secret: SECRET.to_vec(), source }))
        .get("/me", whoami)
}

#[tokio::test]
async fn jwt_requires_a_header() {
    let res = jwt_app(TokenSource::Header).handle(request("GET", "/me")).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&res), "Missing Authorization header");
}

#[tokio::test]
async fn jwt_stores_claims_in_the_context() {
    let bearer = format!("Bearer {}", token(json!({"sub": "ada", "exp": now() + 600}), SECRET));
    let res = jwt_app(TokenSource::Header)
        .handle(request_with("GET", "/me", &[("authorization", bearer.as_str())]))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "ada");
}

#[tokio::test]
async fn jwt_rejects_bad_signatures_and_expired_tokens() {
    let forged = format!("Bearer {}", token(json!({"sub": "mallory"}), b"wrong secret"));
    let expired = format!("Bearer {}", token(json!({"sub": "ada", "exp": now() - 3600}), SECRET));

    for value in [forged.as_str(), expired.as_str(), "Bearer not-a-jwt"] {
        let res = jwt_app(TokenSource::Header)
            .handle(request_with("GET", "/me", &[("authorization", value)]))
            .await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED, "{value}");
        assert_eq!(body(&res), "Invalid token");
    }
}

#[tokio::test]
async fn jwt_reads_the_configured_cookie() {
    let app = jwt_app(TokenSource::Cookie("session".into()));

    let res = app.handle(request_with("GET", "/me", &[("cookie", "theme=dark")])).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&res), "Missing authentication cookie");

    let cookie = format!("theme=dark; session={}", token(json!({"sub": "grace"}), SECRET));
    let res = app.handle(request_with("GET", "/me", &[("cookie", cookie.as_str())])).await;
    assert_eq!(body(&res), "grace");
}

#[tokio::test]
async fn jwt_without_a_context_is_500() {
    let bearer = format!("Bearer {}", token(json!({"sub": "ada"}), SECRET));
    let app = Router::new()
        .middleware(from_fn(|mut req: Request, next: Next| async move {
            req.extensions_mut().clear();
            next.run(req).await
        }))
        .middleware(JwtAuth::new(JwtConfig { secret: SECRET.to_vec(), source: TokenSource::Header }))
        .get("/me", whoami);

    let res = app.handle(request_with("GET", "/me", &[("authorization", bearer.as_str())])).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&res), "Internal Server Error");
}

// ── Content type ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn allowed_content_type_is_echoed_when_unset() {
    let app = Router::new()
        .middleware(AllowedContentType::new(["application/json", "application/xml"]))
        .post("/bare", |_req: Request| async { Response::status(StatusCode::ACCEPTED) })
        .post("/text", |_req: Request| async { "typed" });

    let res = app.handle(request_with("POST", "/bare", &[("content-type", "application/json")])).await;
    assert_eq!(res.headers()["content-type"], "application/json");

    let res = app.handle(request_with("POST", "/text", &[("content-type", "application/json")])).await;
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");

    let res = app.handle(request_with("POST", "/bare", &[("content-type", "text/csv")])).await;
    assert!(!res.headers().contains_key("content-type"));
}
