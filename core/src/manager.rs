//! The dispatch context: active configuration, transport and hook chains.
//!
//! # Design
//! An `ApiManager` is built once and then treated as immutable. Hook lists
//! are frozen at construction; adding a hook yields a new manager, so a call
//! already in flight always sees the context it started with. Tests build an
//! isolated manager around a `StubTransport` instead of swapping global
//! state.
//!
//! Dispatch order for one call: build the `ApiRequest`, run the before hooks
//! in registration order, encode and execute, wrap the outcome in an
//! `ApiResponse`, run the after hooks in registration order, then attach the
//! parsed body.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::config::ApiConfig;
use crate::error::{Result, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ParameterEncoding};
use crate::namespace::fetch_path;
use crate::transport::{Transport, UreqTransport};
use crate::types::{ApiCall, Parameters};

/// Outgoing request descriptor handed to hooks.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub url: String,
    pub parameters: Parameters,
    pub headers: Vec<(String, String)>,
    pub encoding: ParameterEncoding,
    pub request_logging: bool,
    /// Set by the logging hook when request logging is enabled.
    pub started_at: Option<Instant>,
    /// Free-form diagnostics hooks may attach.
    pub user_info: Map<String, Value>,
}

impl ApiRequest {
    pub fn new(call: &ApiCall, config: &ApiConfig) -> Self {
        Self {
            method: call.method(),
            path: call.path().to_string(),
            url: config.url_for(call.path()),
            parameters: call.parameters().clone(),
            headers: config.headers.clone(),
            encoding: config.encoding,
            request_logging: config.request_logging,
            started_at: None,
            user_info: Map::new(),
        }
    }
}

/// Uniform envelope around one transport round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub error: Option<TransportError>,
    /// Body decoded by the configured parser, after root-namespace unwrapping.
    pub parsed: Option<Value>,
}

impl ApiResponse {
    pub fn from_transport(result: std::result::Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) => Self {
                status: Some(response.status),
                headers: response.headers,
                body: Some(response.body).filter(|b| !b.is_empty()),
                error: response.body_error,
                parsed: None,
            },
            Err(error) => Self {
                error: Some(error),
                ..Self::default()
            },
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }

    pub fn is_internal_server_error(&self) -> bool {
        matches!(self.status, Some(500..=599))
    }

    pub fn is_unprocessable_entity(&self) -> bool {
        self.status == Some(422)
    }

    /// A missing status counts as a client-side failure.
    pub fn is_client_error(&self) -> bool {
        match self.status {
            Some(status) => (400..=499).contains(&status),
            None => true,
        }
    }
}

pub type BeforeHook = Arc<dyn Fn(&mut ApiRequest) + Send + Sync>;
pub type AfterHook = Arc<dyn Fn(&ApiRequest, &ApiResponse) + Send + Sync>;

#[derive(Clone)]
pub struct ApiManager {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
    before: Arc<[BeforeHook]>,
    after: Arc<[AfterHook]>,
}

impl fmt::Debug for ApiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiManager")
            .field("config", &self.config)
            .field("before_hooks", &self.before.len())
            .field("after_hooks", &self.after.len())
            .finish_non_exhaustive()
    }
}

impl ApiManager {
    /// Manager over the default `ureq` transport.
    pub fn new(config: ApiConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ApiConfig) -> ApiManagerBuilder {
        ApiManagerBuilder {
            config,
            transport: None,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// A new manager with `hook` appended to the before chain.
    pub fn with_before_request<F>(&self, hook: F) -> Self
    where
        F: Fn(&mut ApiRequest) + Send + Sync + 'static,
    {
        let mut before = self.before.to_vec();
        before.push(Arc::new(hook));
        Self {
            before: before.into(),
            ..self.clone()
        }
    }

    /// A new manager with `hook` appended to the after chain.
    pub fn with_after_request<F>(&self, hook: F) -> Self
    where
        F: Fn(&ApiRequest, &ApiResponse) + Send + Sync + 'static,
    {
        let mut after = self.after.to_vec();
        after.push(Arc::new(hook));
        Self {
            after: after.into(),
            ..self.clone()
        }
    }

    /// A new manager with a different default configuration.
    pub fn with_config(&self, config: ApiConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    /// Dispatch `call` with `config` and return the response envelope.
    ///
    /// Fails only if the parameters cannot be encoded; transport failures
    /// are carried on the envelope.
    pub async fn request(&self, call: &ApiCall, config: &ApiConfig) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(call, config);
        for hook in self.before.iter() {
            hook(&mut request);
        }

        let http = HttpRequest::encode(
            request.method,
            &request.url,
            &request.parameters,
            &request.headers,
            request.encoding,
        )?;
        tracing::debug!(method = %http.method, url = %http.url, "dispatching request");

        let mut response = ApiResponse::from_transport(self.transport.execute(&http).await);
        if let Some(err) = &response.error {
            tracing::debug!(method = %http.method, url = %http.url, "transport failed: {err}");
        }

        for hook in self.after.iter() {
            hook(&request, &response);
        }

        response.parsed = response
            .body
            .as_deref()
            .and_then(|body| config.parser.parse(body))
            .and_then(|tree| unwrap_root(tree, &config.root_namespace));
        Ok(response)
    }
}

fn unwrap_root(tree: Value, root: &str) -> Option<Value> {
    if root.is_empty() || !tree.is_object() {
        return Some(tree);
    }
    fetch_path(root, &tree).cloned()
}

pub struct ApiManagerBuilder {
    config: ApiConfig,
    transport: Option<Arc<dyn Transport>>,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
}

impl ApiManagerBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ApiRequest) + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    pub fn after_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApiRequest, &ApiResponse) + Send + Sync + 'static,
    {
        self.after.push(Arc::new(hook));
        self
    }

    /// Freeze the hook chains. The request-logging hooks always run first.
    pub fn build(self) -> ApiManager {
        let mut before: Vec<BeforeHook> = Vec::with_capacity(self.before.len() + 1);
        before.push(Arc::new(log_request_start));
        before.extend(self.before);
        let mut after: Vec<AfterHook> = Vec::with_capacity(self.after.len() + 1);
        after.push(Arc::new(log_request_finish));
        after.extend(self.after);

        ApiManager {
            config: self.config,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(UreqTransport::new())),
            before: before.into(),
            after: after.into(),
        }
    }
}

fn log_request_start(request: &mut ApiRequest) {
    if !request.request_logging {
        return;
    }
    request.started_at = Some(Instant::now());
    let header_names: Vec<&str> = request.headers.iter().map(|(name, _)| name.as_str()).collect();
    tracing::info!("{} {} with headers: {:?}", request.method, request.path, header_names);
}

fn log_request_finish(request: &ApiRequest, response: &ApiResponse) {
    if !request.request_logging {
        return;
    }
    let duration = request
        .started_at
        .map(|started| format!("{:.2}", started.elapsed().as_secs_f64()))
        .unwrap_or_else(|| "?".to_string());
    tracing::info!(
        "{} {} finished in {} seconds with status {}",
        request.method,
        request.path,
        duration,
        response.status.unwrap_or(0)
    );
    if let Some(err) = &response.error {
        tracing::warn!("{} {} error: {err}", request.method, request.path);
    }
}
