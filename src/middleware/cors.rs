//! Cross-origin resource sharing.

use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue, ORIGIN,
};
use http::{Method, StatusCode};
use tracing::debug;

use crate::handler::Next;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

use super::Middleware;

/// CORS policy.
///
/// An empty `allowed_origins` list allows every origin; `"*"` in the list
/// does the same.
#[derive(Clone, Debug, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

/// Applies a [`CorsConfig`]. Disallowed origins get `403`; `OPTIONS`
/// preflights are answered with `204` without reaching the handler.
#[derive(Clone, Debug)]
pub struct Cors {
    origins: Vec<String>,
    methods: Option<HeaderValue>,
    headers: Option<HeaderValue>,
    credentials: bool,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self {
            origins: config.allowed_origins,
            methods: joined(&config.allowed_methods),
            headers: joined(&config.allowed_headers),
            credentials: config.allow_credentials,
        }
    }

    fn allows(&self, origin: &str) -> bool {
        self.origins.is_empty() || self.origins.iter().any(|o| o == "*" || o == origin)
    }

    fn decorate(&self, res: &mut Response, origin: Option<&HeaderValue>) {
        let headers = res.headers_mut();
        if let Some(origin) = origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
        if self.credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if let Some(methods) = &self.methods {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(allowed) = &self.headers {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone());
        }
    }
}

fn joined(values: &[String]) -> Option<HeaderValue> {
    if values.is_empty() {
        return None;
    }
    HeaderValue::try_from(values.join(", ")).ok()
}

impl Middleware for Cors {
    fn wrap(&self, next: Next) -> Next {
        let policy = self.clone();
        Next::new(move |req: Request| {
            let policy = policy.clone();
            let next = next.clone();
            async move {
                let origin = req.headers().get(ORIGIN).cloned();
                let origin_str = origin.as_ref().and_then(|o| o.to_str().ok()).unwrap_or("");
                if !policy.allows(origin_str) {
                    debug!(origin = origin_str, "cors: origin rejected");
                    return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
                }

                let mut res = if req.method() == Method::OPTIONS {
                    Response::status(StatusCode::NO_CONTENT)
                } else {
                    next.run(req).await
                };
                policy.decorate(&mut res, origin.as_ref());
                res
            }
        })
    }
}
