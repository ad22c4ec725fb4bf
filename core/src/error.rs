//! Error types for the resource binding layer.
//!
//! # Design
//! Expected failure classes (server errors, validation errors, unauthorized,
//! malformed bodies) are never returned as `Err`: they are carried as data on
//! `ClassifiedResponse`. `Error` is reserved for contract violations detected
//! while a call is being constructed, before anything is dispatched.
//! `TransportError` describes a failed round-trip and is stored inside the
//! response envelope.

use thiserror::Error;

use crate::types::RouteKind;

/// Result alias for call-construction failures.
pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations raised while building a call.
#[derive(Debug, Error)]
pub enum Error {
    /// A call was built with an empty path.
    #[error("call path must not be empty")]
    EmptyPath,

    /// The model type does not declare the route the operation needs.
    #[error("model does not declare the {0} route")]
    MissingRoute(RouteKind),

    /// A `:field:` placeholder names a field the instance does not serialize.
    #[error("route {route} references missing field `{field}`")]
    MissingRouteField { route: String, field: String },

    /// Outgoing parameters could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// A round-trip that produced no usable HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("i/o error: {0}")]
    Io(String),

    /// The status line arrived but the body could not be read.
    #[error("response body could not be read: {0}")]
    Body(String),

    /// The blocking task running the request could not be joined.
    #[error("transport task failed: {0}")]
    Runtime(String),
}
