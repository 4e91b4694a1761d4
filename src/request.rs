//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, HeaderMap};

use crate::context::{self, Carrier, RequestContext};
use crate::error::Error;

/// Peer address recorded by the host transport.
#[derive(Clone, Copy, Debug)]
struct RemoteAddr(SocketAddr);

/// An incoming HTTP request with its body already buffered.
///
/// Wraps an [`http::Request`] so hosts hand over whatever their transport
/// produced. The request's extensions carry the router's
/// [`RequestContext`]; see [`crate::context`].
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self { inner }
    }

    /// Records the client address. Rate limiting keys on it by default.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.inner.extensions_mut().insert(RemoteAddr(addr));
        self
    }

    pub fn method(&self) -> &http::Method { self.inner.method() }
    pub fn path(&self) -> &str { self.inner.uri().path() }
    pub fn uri(&self) -> &http::Uri { self.inner.uri() }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &Bytes { self.inner.body() }
    pub fn extensions(&self) -> &Extensions { self.inner.extensions() }
    pub fn extensions_mut(&mut self) -> &mut Extensions { self.inner.extensions_mut() }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.extensions().get::<RemoteAddr>().map(|a| a.0)
    }

    /// Header lookup. Values that are not visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// The context the router attached for this dispatch.
    pub fn context(&self) -> Result<&RequestContext, Error> {
        context::current(&self.inner)
    }

    pub fn context_mut(&mut self) -> Result<&mut RequestContext, Error> {
        context::slot_mut(self.inner.extensions_mut())
    }

    /// Returns a named path parameter, or `""` when it is not bound.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `"42"`.
    pub fn param(&self, name: &str) -> &str {
        context::param(&self.inner, name)
    }

    pub fn into_inner(self) -> http::Request<Bytes> {
        self.inner
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(inner: http::Request<Bytes>) -> Self {
        Self::new(inner)
    }
}

impl Carrier for Request {
    fn carrier(&self) -> &Extensions {
        self.inner.extensions()
    }
}
