//! Echoes an accepted request content type onto the response.

use http::header::{CONTENT_TYPE, HeaderValue};

use crate::handler::Next;
use crate::request::Request;

use super::Middleware;

/// If the request's `Content-Type` is one of the listed values and the
/// handler did not set one, the response is labelled with it.
#[derive(Clone, Debug)]
pub struct AllowedContentType {
    allowed: Vec<String>,
}

impl AllowedContentType {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { allowed: allowed.into_iter().map(Into::into).collect() }
    }

    fn pick(&self, req: &Request) -> Option<HeaderValue> {
        let requested = req.headers().get(CONTENT_TYPE)?;
        let text = requested.to_str().ok()?;
        self.allowed.iter().any(|a| a == text).then(|| requested.clone())
    }
}

impl Middleware for AllowedContentType {
    fn wrap(&self, next: Next) -> Next {
        let policy = self.clone();
        Next::new(move |req: Request| {
            let echoed = policy.pick(&req);
            let next = next.clone();
            async move {
                let mut res = next.run(req).await;
                if let Some(value) = echoed {
                    res.headers_mut().entry(CONTENT_TYPE).or_insert(value);
                }
                res
            }
        })
    }
}
