//! Call descriptions and per-model declarations.
//!
//! # Design
//! `ApiCall` is the unit of work handed to the transport adapter: one method,
//! one path, its parameters and the namespace the payload travels under.
//! Calls are immutable once built and are discarded after dispatch.
//! `ApiNamespace` and `ApiRoutes` are declared once per model type and shared
//! read-only by every call made for that type.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::http::HttpMethod;

/// Outgoing request parameters.
pub type Parameters = Map<String, Value>;

/// Keys a resource's payload is wrapped under on the way out and expected
/// under on the way back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiNamespace {
    request: Option<String>,
    response: Option<String>,
    plural: Option<String>,
}

impl ApiNamespace {
    pub fn new(request: Option<&str>, response: Option<&str>) -> Self {
        Self {
            request: non_empty(request),
            response: non_empty(response),
            plural: None,
        }
    }

    /// Same key in both directions. An empty key means no wrapping.
    pub fn symmetric(key: &str) -> Self {
        Self::new(Some(key), Some(key))
    }

    /// Explicit plural for the response key, bypassing the inflector.
    pub fn with_plural(mut self, plural: &str) -> Self {
        self.plural = non_empty(Some(plural));
        self
    }

    pub fn request_key(&self) -> Option<&str> {
        self.request.as_deref()
    }

    pub fn response_key(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn plural_override(&self) -> Option<&str> {
        self.plural.as_deref()
    }

    /// Wrap `payload` under the request key, or pass it through unwrapped.
    pub fn wrap(&self, payload: Map<String, Value>) -> Parameters {
        match &self.request {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), Value::Object(payload));
                wrapped
            }
            None => payload,
        }
    }
}

fn non_empty(key: Option<&str>) -> Option<String> {
    key.filter(|k| !k.is_empty()).map(str::to_string)
}

/// The route slots a model type can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Index,
    Show,
    Create,
    Update,
    Destroy,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteKind::Index => "index",
            RouteKind::Show => "show",
            RouteKind::Create => "create",
            RouteKind::Update => "update",
            RouteKind::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// Rails-style route table. Templates may contain `:field:` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRoutes {
    pub index: Option<String>,
    pub show: Option<String>,
    pub create: Option<String>,
    pub update: Option<String>,
    pub destroy: Option<String>,
}

impl ApiRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, path: &str) -> Self {
        self.index = Some(path.to_string());
        self
    }

    pub fn show(mut self, path: &str) -> Self {
        self.show = Some(path.to_string());
        self
    }

    pub fn create(mut self, path: &str) -> Self {
        self.create = Some(path.to_string());
        self
    }

    pub fn update(mut self, path: &str) -> Self {
        self.update = Some(path.to_string());
        self
    }

    pub fn destroy(mut self, path: &str) -> Self {
        self.destroy = Some(path.to_string());
        self
    }

    /// The template for `kind`, or `Error::MissingRoute`.
    pub fn get(&self, kind: RouteKind) -> Result<&str> {
        let route = match kind {
            RouteKind::Index => &self.index,
            RouteKind::Show => &self.show,
            RouteKind::Create => &self.create,
            RouteKind::Update => &self.update,
            RouteKind::Destroy => &self.destroy,
        };
        route
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or(Error::MissingRoute(kind))
    }
}

/// Substitute every `:field:` placeholder in `template` with the matching
/// value from an instance's wire representation.
pub fn route_with_replacements(template: &str, wire: &Map<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        let Some(len) = after.find(':') else { break };
        let field = &after[..len];
        if field.is_empty() || !field.chars().all(|c| c.is_alphanumeric() || c == '_') {
            // Not a placeholder; keep the colon and move on.
            out.push_str(&rest[..=start]);
            rest = after;
            continue;
        }

        let value = wire
            .get(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::MissingRouteField {
                route: template.to_string(),
                field: field.to_string(),
            })?;
        out.push_str(&rest[..start]);
        match value {
            Value::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
        rest = &after[len + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// One logical remote operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    method: HttpMethod,
    path: String,
    parameters: Parameters,
    namespace: ApiNamespace,
}

impl ApiCall {
    pub fn build(
        method: HttpMethod,
        path: &str,
        parameters: Parameters,
        namespace: ApiNamespace,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }
        Ok(Self {
            method,
            path: path.to_string(),
            parameters,
            namespace,
        })
    }

    pub fn new(method: HttpMethod, path: &str) -> Result<Self> {
        Self::build(method, path, Parameters::new(), ApiNamespace::default())
    }

    pub fn get(path: &str, parameters: Parameters, namespace: ApiNamespace) -> Result<Self> {
        Self::build(HttpMethod::Get, path, parameters, namespace)
    }

    pub fn post(path: &str, parameters: Parameters, namespace: ApiNamespace) -> Result<Self> {
        Self::build(HttpMethod::Post, path, parameters, namespace)
    }

    pub fn put(path: &str, parameters: Parameters, namespace: ApiNamespace) -> Result<Self> {
        Self::build(HttpMethod::Put, path, parameters, namespace)
    }

    pub fn delete(path: &str, parameters: Parameters, namespace: ApiNamespace) -> Result<Self> {
        Self::build(HttpMethod::Delete, path, parameters, namespace)
    }

    /// GET `path` without parameters or namespace.
    pub fn get_path(path: &str) -> Result<Self> {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post_path(path: &str) -> Result<Self> {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put_path(path: &str) -> Result<Self> {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete_path(path: &str) -> Result<Self> {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn namespace(&self) -> &ApiNamespace {
        &self.namespace
    }
}
