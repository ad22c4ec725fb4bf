//! The capability every bindable model type implements.
//!
//! # Design
//! A model type declares its wire namespace, its route table, how inbound
//! wire values map onto its fields, and how it serializes itself back out.
//! Everything generic in the pipeline is parametrized over `ApiModel`, so a
//! type that forgets one of these fails to compile rather than failing at
//! runtime.

use serde_json::{Map, Value};

use crate::config::ApiConfig;
use crate::error::Result;
use crate::transform::WireMapping;
use crate::types::{route_with_replacements, ApiNamespace, ApiRoutes, RouteKind};

pub trait ApiModel: Default + Clone + Send + Sync + 'static {
    /// Singular key the resource travels under (`"post"`, not `"posts"`).
    /// Empty means payloads are not wrapped.
    fn api_namespace() -> &'static str {
        ""
    }

    /// Request/response namespace pair. Override for asymmetric APIs.
    fn namespace() -> ApiNamespace {
        ApiNamespace::symmetric(Self::api_namespace())
    }

    fn routes() -> ApiRoutes;

    fn wire_mapping() -> WireMapping<Self>;

    /// Outbound wire representation.
    fn to_wire(&self) -> Map<String, Value>;

    /// Whether the instance already exists remotely.
    fn has_persisted_identity(&self) -> bool;

    /// Configuration used for this type, derived from the manager default.
    fn api_config(base: &ApiConfig) -> ApiConfig {
        base.clone()
    }

    fn from_wire(wire: &Map<String, Value>) -> Self {
        let mut model = Self::default();
        model.apply_wire_update(wire);
        model
    }

    /// Overwrite-merge `wire` into `self`.
    fn apply_wire_update(&mut self, wire: &Map<String, Value>) {
        Self::wire_mapping().apply(self, wire);
    }

    /// The `kind` route with this instance's `:field:` placeholders filled.
    fn route(&self, kind: RouteKind) -> Result<String> {
        let routes = Self::routes();
        route_with_replacements(routes.get(kind)?, &self.to_wire())
    }
}
