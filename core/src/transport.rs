//! The HTTP capability the pipeline dispatches through.
//!
//! # Design
//! `Transport` is the only seam that performs network I/O. It receives a
//! fully encoded `HttpRequest` and returns the status, headers and body as
//! data; a non-2xx status is a normal `Ok` result; `Err` is reserved for
//! round-trips that produced no response at all.
//!
//! `UreqTransport` runs a blocking `ureq` agent on tokio's blocking pool.
//! `StubTransport` answers from a closure and records what it was sent, for
//! test-scoped contexts.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP round-trip.
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Largest response body read before the read is abandoned.
pub const DEFAULT_BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// Blocking `ureq` agent driven from tokio's blocking thread pool.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Transport whose round-trips give up after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        // Status codes are data for the classifier, not errors.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Give up reading bodies larger than `limit` bytes. The status and
    /// headers are still reported.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let request = request.clone();
        let body_limit = self.body_limit;
        tokio::task::spawn_blocking(move || send_blocking(&agent, request, body_limit))
            .await
            .map_err(|e| TransportError::Runtime(e.to_string()))?
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_blocking(agent: &ureq::Agent, req: HttpRequest, body_limit: u64) -> Result<HttpResponse, TransportError> {
    let result = match req.method {
        HttpMethod::Get => with_headers(agent.get(&req.url), &req.headers).call(),
        HttpMethod::Delete => {
            let builder = with_headers(agent.delete(&req.url), &req.headers);
            match &req.body {
                Some(body) => builder.force_send_body().send(body.as_bytes()),
                None => builder.call(),
            }
        }
        HttpMethod::Post => {
            let builder = with_headers(agent.post(&req.url), &req.headers);
            match &req.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
        HttpMethod::Put => {
            let builder = with_headers(agent.put(&req.url), &req.headers);
            match &req.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(map_ureq_error)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let (body, body_error) = match response.body_mut().with_config().limit(body_limit).read_to_string() {
        Ok(body) => (body, None),
        Err(err) => {
            tracing::debug!(url = %req.url, status, "response body unreadable: {err}");
            (String::new(), Some(TransportError::Body(err.to_string())))
        }
    };

    Ok(HttpResponse {
        status,
        headers,
        body,
        body_error,
    })
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) => TransportError::Io(e.to_string()),
        other => TransportError::Connection(other.to_string()),
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Closure-backed transport that records every request it receives.
pub struct StubTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `status` and `body`.
    pub fn respond(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_| Ok(HttpResponse::new(status, &body)))
    }

    /// Fail every request with `error`.
    pub fn fail(error: TransportError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Requests received so far, in dispatch order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        (self.handler)(request)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;

    use super::*;
    use crate::http::ParameterEncoding;
    use serde_json::json;

    /// Accept one connection on loopback, answer it with `response` and
    /// report the raw request text.
    fn serve_once(response: Vec<u8>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let _ = tx.send(request);
            // The client may hang up early when it stops reading.
            let _ = stream.write_all(&response);
        });
        (url, rx)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn ok_with_body(body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn stub_records_requests() {
        let stub = StubTransport::respond(200, "{}");
        stub.execute(&get("http://a.test/one")).await.unwrap();
        stub.execute(&get("http://a.test/two")).await.unwrap();

        let urls: Vec<_> = stub.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["http://a.test/one", "http://a.test/two"]);
    }

    #[tokio::test]
    async fn stub_failure_is_returned() {
        let stub = StubTransport::fail(TransportError::Timeout);
        let err = stub.execute(&get("http://a.test")).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout);
    }

    #[tokio::test]
    async fn ureq_sends_delete_parameters_as_body() {
        let (url, received) =
            serve_once(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_vec());
        let parameters = json!({"reason": "spam"}).as_object().cloned().unwrap();
        let request = HttpRequest::encode(
            HttpMethod::Delete,
            &format!("{url}/posts/3.json"),
            &parameters,
            &[],
            ParameterEncoding::Json,
        )
        .unwrap();

        let response = UreqTransport::new().execute(&request).await.unwrap();
        assert_eq!(response.status, 204);

        let raw = received.recv().unwrap();
        assert!(raw.starts_with("DELETE /posts/3.json "), "{raw}");
        assert!(raw.to_ascii_lowercase().contains("content-type: application/json"), "{raw}");
        assert!(raw.ends_with(r#"{"reason":"spam"}"#), "{raw}");
    }

    #[tokio::test]
    async fn ureq_keeps_status_when_body_exceeds_limit() {
        let (url, _received) = serve_once(ok_with_body(&[b'x'; 64]));
        let transport = UreqTransport::new().with_body_limit(16);

        let response = transport.execute(&get(&url)).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert!(matches!(response.body_error, Some(TransportError::Body(_))));
    }

    #[tokio::test]
    async fn ureq_reads_bodies_past_ureq_default_limit() {
        let body = format!("\"{}\"", "a".repeat(11 * 1024 * 1024));
        let (url, _received) = serve_once(ok_with_body(body.as_bytes()));

        let response = UreqTransport::new().execute(&get(&url)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), body.len());
        assert!(response.body_error.is_none());
    }

    #[tokio::test]
    async fn ureq_reports_connection_failure() {
        // Nothing listens on port 9 (discard) on loopback in test environments.
        let transport = UreqTransport::with_timeout(Some(Duration::from_secs(2)));
        let result = transport.execute(&get("http://127.0.0.1:9/")).await;
        assert!(result.is_err());
    }
}
