//! Transport configuration and the body parser capability.
//!
//! An `ApiConfig` is a plain value. Deriving a specialised config for one
//! model type or one call means cloning the default and changing fields,
//! which never affects the original.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::http::ParameterEncoding;

/// Decodes a response body into a generic tree.
///
/// Implementations return `None` for empty or non-conforming bodies and never
/// fail.
pub trait Parser: Send + Sync {
    fn parse(&self, body: &str) -> Option<Value>;
}

/// JSON body parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, body: &str) -> Option<Value> {
        if body.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(body) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!("response body is not JSON: {err}");
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct ApiConfig {
    /// Scheme, host and optional base path prepended to every call path.
    pub host: String,
    /// Dotted path unwrapped from every mapping body before namespace
    /// resolution. Empty means no unwrapping.
    pub root_namespace: String,
    pub request_logging: bool,
    pub encoding: ParameterEncoding,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
    pub parser: Arc<dyn Parser>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            root_namespace: String::new(),
            request_logging: false,
            encoding: ParameterEncoding::default(),
            headers: Vec::new(),
            parser: Arc::new(JsonParser),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("root_namespace", &self.root_namespace)
            .field("request_logging", &self.request_logging)
            .field("encoding", &self.encoding)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    pub fn new(host: &str) -> Self {
        Self::default().with_host(host)
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `APIMODEL_HOST`, `APIMODEL_ROOT_NAMESPACE` and
    /// `APIMODEL_REQUEST_LOGGING` (`1` or `true`). Unset variables keep their
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("APIMODEL_HOST") {
            config = config.with_host(&host);
        }
        if let Ok(root) = std::env::var("APIMODEL_ROOT_NAMESPACE") {
            config.root_namespace = root;
        }
        if let Ok(flag) = std::env::var("APIMODEL_REQUEST_LOGGING") {
            config.request_logging = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }
        config
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.trim_end_matches('/').to_string();
        self
    }

    pub fn with_root_namespace(mut self, root: &str) -> Self {
        self.root_namespace = root.to_string();
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn Parser>) -> Self {
        self.parser = parser;
        self
    }

    /// Absolute URL for `path`. Paths that already carry a scheme are used
    /// as-is.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') || self.host.is_empty() {
            format!("{}{path}", self.host)
        } else {
            format!("{}/{path}", self.host)
        }
    }
}
