//! Per-request context and the carrier slot it travels in.
//!
//! Every dispatch builds exactly one [`RequestContext`] and stores it in the
//! request's [`http::Extensions`] before the middleware chain runs. The slot
//! is a private newtype, so its `TypeId` is the one well-known key: nothing
//! outside this module can write it or shadow it with an unrelated value.
//!
//! Middleware never receives the context as a parameter. It reads it back from
//! the request it is handed:
//!
//! ```rust
//! use switchyard::{context, IntoResponse, Request, Response};
//!
//! async fn show(req: Request) -> Response {
//!     // Same lookup, three spellings.
//!     let a = req.param("id");
//!     let b = context::param(&req, "id");
//!     let c = match req.context() {
//!         Ok(ctx) => ctx.param("id"),
//!         Err(e) => return e.into_response(),
//!     };
//!     assert!(a == b && b == c);
//!     Response::text(a.to_owned())
//! }
//! ```
//!
//! A missing slot is an explicit [`Error::MissingContext`], never a default
//! value, so a layer that dropped the extensions is caught rather than
//! silently served an empty context.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::Extensions;

use crate::error::Error;
use crate::path::Params;

/// State derived for one in-flight request.
///
/// Owned by that request alone: it lives inside the request value that moves
/// through the chain and is dropped with it when dispatch returns.
#[derive(Clone, Default)]
pub struct RequestContext {
    method: String,
    path: String,
    pattern: Option<String>,
    params: Params,
    claims: Option<Arc<dyn Any + Send + Sync>>,
}

impl RequestContext {
    pub fn new(params: Params) -> Self {
        Self { params, ..Self::default() }
    }

    /// Records what dispatch routed on. `pattern` is `None` for a miss.
    pub(crate) fn routed(mut self, method: &str, path: &str, pattern: Option<&str>) -> Self {
        self.method = method.to_owned();
        self.path = path.to_owned();
        self.pattern = pattern.map(str::to_owned);
        self
    }

    /// The method dispatch routed on, which may differ from the request line.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The registered pattern that matched, e.g. `/users/:id`.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The value bound to `:name` by the matched pattern, or `""`.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or("")
    }

    /// Stores authentication claims. The router never inspects them.
    pub fn set_claims<T: Any + Send + Sync>(&mut self, claims: T) {
        self.claims = Some(Arc::new(claims));
    }

    /// Typed read of the stored claims. `None` when unset or of another type.
    pub fn claims<T: Any>(&self) -> Option<&T> {
        self.claims.as_deref()?.downcast_ref::<T>()
    }

    pub fn has_claims(&self) -> bool {
        self.claims.is_some()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field("claims", &self.claims.is_some())
            .finish()
    }
}

/// The carrier slot.
#[derive(Clone)]
struct Slot(RequestContext);

/// Anything that carries request extensions and can therefore hold the slot.
pub trait Carrier {
    fn carrier(&self) -> &Extensions;
}

impl Carrier for Extensions {
    fn carrier(&self) -> &Extensions {
        self
    }
}

impl<B> Carrier for http::Request<B> {
    fn carrier(&self) -> &Extensions {
        self.extensions()
    }
}

/// Stores `ctx` in the slot. Returns `true` if a stale context was replaced.
pub(crate) fn attach(extensions: &mut Extensions, ctx: RequestContext) -> bool {
    extensions.insert(Slot(ctx)).is_some()
}

pub(crate) fn slot_mut(extensions: &mut Extensions) -> Result<&mut RequestContext, Error> {
    extensions
        .get_mut::<Slot>()
        .map(|slot| &mut slot.0)
        .ok_or(Error::MissingContext)
}

/// The context attached to `carrier` by the router.
pub fn current<C: Carrier + ?Sized>(carrier: &C) -> Result<&RequestContext, Error> {
    carrier
        .carrier()
        .get::<Slot>()
        .map(|slot| &slot.0)
        .ok_or(Error::MissingContext)
}

/// Parameter lookup for code that only holds the transport-level request.
///
/// Returns `""` when the parameter is unbound or no context is attached.
pub fn param<'a, C: Carrier + ?Sized>(carrier: &'a C, name: &str) -> &'a str {
    current(carrier).map(|ctx| ctx.param(name)).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::match_path;

    #[derive(Debug, PartialEq)]
    struct User(&'static str);

    fn ctx_for(pattern: &str, path: &str) -> RequestContext {
        RequestContext::new(match_path(pattern, path).unwrap())
    }

    #[test]
    fn missing_param_is_empty() {
        let ctx = ctx_for("/users/:id", "/users/9");
        assert_eq!(ctx.param("id"), "9");
        assert_eq!(ctx.param("missing"), "");
    }

    #[test]
    fn routed_records_what_dispatch_saw() {
        let ctx = ctx_for("/users/:id", "/users/9").routed("DELETE", "/users/9", Some("/users/:id"));
        assert_eq!(ctx.method(), "DELETE");
        assert_eq!(ctx.path(), "/users/9");
        assert_eq!(ctx.pattern(), Some("/users/:id"));
        assert_eq!(ctx.param("id"), "9");

        let miss = RequestContext::default().routed("GET", "/nowhere", None);
        assert_eq!(miss.pattern(), None);
    }

    #[test]
    fn claims_are_typed() {
        let mut ctx = RequestContext::default();
        assert!(!ctx.has_claims());
        ctx.set_claims(User("ada"));
        assert_eq!(ctx.claims::<User>(), Some(&User("ada")));
        assert_eq!(ctx.claims::<String>(), None);
    }

    #[test]
    fn slot_round_trips_through_extensions() {
        let mut ext = Extensions::new();
        assert!(matches!(current(&ext), Err(Error::MissingContext)));
        assert_eq!(param(&ext, "id"), "");

        assert!(!attach(&mut ext, ctx_for("/:id", "/1")));
        assert_eq!(param(&ext, "id"), "1");

        // A second attach replaces, never stacks.
        assert!(attach(&mut ext, ctx_for("/:id", "/2")));
        assert_eq!(current(&ext).unwrap().param("id"), "2");
    }

    #[test]
    fn plain_http_request_is_a_carrier() {
        let mut req = http::Request::new(());
        attach(req.extensions_mut(), ctx_for("/a/:b", "/a/c"));
        assert_eq!(param(&req, "b"), "c");
        slot_mut(req.extensions_mut()).unwrap().set_claims(User("x"));
        assert!(current(&req).unwrap().has_claims());
    }

    #[test]
    fn a_user_extension_of_the_same_shape_is_not_the_slot() {
        let mut ext = Extensions::new();
        ext.insert(RequestContext::default());
        assert!(current(&ext).is_err());
    }
}
