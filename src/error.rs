//! Unified error type.

use thiserror::Error;

/// The error type returned by switchyard's fallible operations.
///
/// Routing misses and middleware rejections are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and broken invariants inside a dispatch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("unknown http method `{0}`")]
    UnknownMethod(String),

    /// The request context slot was not found on the carrier. Something in
    /// the chain replaced or cleared the request's extensions.
    #[error("request context missing from the request carrier")]
    MissingContext,

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
