//! HTTP transport abstraction for testability

use std::time::Duration;

use crate::error::{UploadError, UploadResult};

/// Default timeout for API and part requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// HTTP methods used by the Figshare API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    /// UTF-8 JSON document.
    Json(Vec<u8>),
    /// Raw bytes sent verbatim (part payloads).
    Binary(Vec<u8>),
}

impl Body {
    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        match self {
            Body::Empty => 0,
            Body::Json(b) | Body::Binary(b) => b.len(),
        }
    }

    /// Whether the body carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully prepared HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Value of the `Authorization` header.
    pub authorization: String,
    pub body: Body,
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for executing HTTP requests.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling in-memory services in tests. Implementations must be safe to
/// share between part-transfer workers.
pub trait Transport: Send + Sync {
    /// Execute a request and return the response, whatever its status.
    ///
    /// Only failures to obtain a response at all are reported as errors.
    fn execute(&self, request: &HttpRequest) -> UploadResult<HttpResponse>;
}

/// Real transport implementation using reqwest's blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout.
    pub fn new() -> UploadResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> UploadResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("areadata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Transport {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
                timed_out: false,
            })?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> UploadResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(reqwest::header::AUTHORIZATION, &request.authorization);

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(bytes) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            Body::Binary(bytes) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes.clone()),
        };

        let transport_error = |e: reqwest::Error| UploadError::Transport {
            url: request.url.clone(),
            reason: e.to_string(),
            timed_out: e.is_timeout(),
        };

        let response = builder.send().map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(transport_error)?.to_vec();

        Ok(HttpResponse { status, body })
    }
}
