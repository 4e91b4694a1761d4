//! JWT bearer authentication.
//!
//! Verifies an HMAC-signed token and stores its claims in the
//! [`RequestContext`](crate::RequestContext), where handlers read them with
//! `req.context()?.claims::<Claims>()`.

use std::sync::Arc;

use http::StatusCode;
use http::header::{AUTHORIZATION, COOKIE};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::handler::Next;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

use super::Middleware;

/// Where the token is read from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum TokenSource {
    /// `Authorization` header; a leading `Bearer ` is stripped.
    #[default]
    Header,
    /// The named cookie.
    Cookie(String),
}

#[derive(Clone, Debug, Default)]
pub struct JwtConfig {
    pub secret: Vec<u8>,
    pub source: TokenSource,
}

/// Decoded token claims.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The `sub` claim, when it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }
}

/// Rejects requests without a valid token with `401`.
///
/// `exp` is checked when the token carries it but is not required.
#[derive(Clone)]
pub struct JwtAuth {
    inner: Arc<Verifier>,
}

struct Verifier {
    key: DecodingKey,
    validation: Validation,
    source: TokenSource,
}

impl JwtAuth {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self {
            inner: Arc::new(Verifier {
                key: DecodingKey::from_secret(&config.secret),
                validation,
                source: config.source,
            }),
        }
    }
}

impl Verifier {
    fn token<'r>(&self, req: &'r Request) -> Result<&'r str, Response> {
        match &self.source {
            TokenSource::Header => {
                let value = req
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| unauthorized("Missing Authorization header"))?;
                Ok(value.strip_prefix("Bearer ").unwrap_or(value))
            }
            TokenSource::Cookie(name) => cookie(req, name)
                .ok_or_else(|| unauthorized("Missing authentication cookie")),
        }
    }

    fn authenticate(&self, req: &mut Request) -> Result<(), Response> {
        let token = self.token(req)?;
        let claims = match decode::<Map<String, Value>>(token, &self.key, &self.validation) {
            Ok(data) => Claims(data.claims),
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                return Err(unauthorized("Invalid token"));
            }
        };
        match req.context_mut() {
            Ok(ctx) => {
                ctx.set_claims(claims);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "jwt: cannot store claims");
                Err(e.into_response())
            }
        }
    }
}

fn unauthorized(message: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, message).into_response()
}

/// Value of cookie `name` across every `Cookie` header.
fn cookie<'r>(req: &'r Request, name: &str) -> Option<&'r str> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

impl Middleware for JwtAuth {
    fn wrap(&self, next: Next) -> Next {
        let verifier = Arc::clone(&self.inner);
        Next::new(move |mut req: Request| {
            let verdict = verifier.authenticate(&mut req);
            let next = next.clone();
            async move {
                match verdict {
                    Ok(()) => next.run(req).await,
                    Err(rejection) => rejection,
                }
            }
        })
    }
}
