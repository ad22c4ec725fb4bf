//! Declarative REST resource binding.
//!
//! # Overview
//! A model type implements `ApiModel` once: its wire namespace, its route
//! table and how wire values map onto its fields. `Api<M>` then offers the
//! remote operations for that type, and `Form<M>` binds one instance to the
//! resource it mirrors. Every call comes back as a `ClassifiedResponse`
//! carrying the typed payload and the two error channels (opaque server
//! errors, field-addressable validation errors).
//!
//! # Design
//! - `ApiManager` is an explicit context (configuration, transport, hook
//!   chains) passed to each `Api<M>`; there is no global state.
//! - `Transport` is the only seam that performs network I/O. The default is
//!   `UreqTransport`; tests use `StubTransport` or the mock server.
//! - Non-2xx statuses and transport failures are data, not `Err`. An `Err`
//!   from this crate means the call could not be constructed.
//! - Instances are reached through the `Persistence` capability, so the
//!   pipeline never holds a model across an await point.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod model;
pub mod namespace;
pub mod response;
pub mod store;
pub mod transform;
pub mod transport;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use client::{Api, Form};
pub use config::{ApiConfig, JsonParser, Parser};
pub use error::{Error, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ParameterEncoding};
pub use manager::{ApiManager, ApiManagerBuilder, ApiRequest, ApiResponse};
pub use model::ApiModel;
pub use response::{ClassifiedResponse, ErrorPayload, Outcome, ValidationError, GENERIC_SERVER_ERROR};
pub use store::{Persistence, Record};
pub use transform::{
    ArrayTransform, BoolTransform, DateTransform, FloatTransform, IdTransform, IntTransform, ModelTransform,
    OptionalTransform, StringTransform, Transform, WireMapping,
};
pub use transport::{StubTransport, Transport, UreqTransport};
pub use types::{ApiCall, ApiNamespace, ApiRoutes, Parameters, RouteKind};
