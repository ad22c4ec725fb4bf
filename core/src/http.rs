//! HTTP transport types.
//!
//! # Design
//! These types describe the wire-level request and response as plain data.
//! The transport adapter turns an `ApiRequest` into an `HttpRequest`, hands
//! it to a `Transport`, and gets an `HttpResponse` back. Nothing here touches
//! the network, which keeps request encoding deterministic and easy to test.

use std::fmt;

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::{Error, Result, TransportError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How outgoing parameters are placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterEncoding {
    /// Query string for GET, JSON body otherwise.
    #[default]
    Json,
    /// Query string for GET and DELETE, form-urlencoded body for POST and PUT.
    Url,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Encode `parameters` onto `url` or into a body according to `encoding`.
    pub fn encode(
        method: HttpMethod,
        url: &str,
        parameters: &Map<String, Value>,
        headers: &[(String, String)],
        encoding: ParameterEncoding,
    ) -> Result<Self> {
        let mut request = HttpRequest {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
            body: None,
        };
        if parameters.is_empty() {
            return Ok(request);
        }

        let in_query = match (method, encoding) {
            (HttpMethod::Get, _) => true,
            (HttpMethod::Delete, ParameterEncoding::Url) => true,
            _ => false,
        };

        if in_query {
            let query = form_encode(parameters);
            let separator = if url.contains('?') { '&' } else { '?' };
            request.url = format!("{url}{separator}{query}");
        } else if encoding == ParameterEncoding::Json {
            let body = serde_json::to_string(parameters).map_err(|e| Error::Serialization(e.to_string()))?;
            request.set_content_type("application/json");
            request.body = Some(body);
        } else {
            request.set_content_type("application/x-www-form-urlencoded");
            request.body = Some(form_encode(parameters));
        }
        Ok(request)
    }

    fn set_content_type(&mut self, value: &str) {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        self.headers.push(("content-type".to_string(), value.to_string()));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Set when the body could not be read; `body` is then empty.
    pub body_error: Option<TransportError>,
}

impl HttpResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
            body_error: None,
        }
    }
}

/// Form-encode a parameter mapping, flattening nested values with the
/// bracket convention (`post[title]=x`, `tags[]=a`).
pub fn form_encode(parameters: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in parameters {
        flatten(key, value, &mut pairs);
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(&format!("{prefix}[{key}]"), nested, out);
            }
        }
        Value::Array(items) => {
            let key = format!("{prefix}[]");
            for item in items {
                flatten(&key, item, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Null => out.push((prefix.to_string(), String::new())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
