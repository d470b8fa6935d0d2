//! Authenticated request/response wrapper around a [`Transport`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::transport::{Body, HttpRequest, Method, Transport};
use crate::error::{UploadError, UploadResult};

/// Personal API token.
///
/// Supplied explicitly to the client; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, stripping surrounding whitespace and newlines.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().trim().to_string())
    }

    /// Whether the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn header_value(&self) -> String {
        format!("token {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A successfully decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Json(serde_json::Value),
    /// Empty or non-JSON bodies are handed back untouched.
    Raw(Vec<u8>),
}

impl Decoded {
    /// Deserialize the body into `T`.
    pub fn into_typed<T: DeserializeOwned>(self, context: &str) -> UploadResult<T> {
        match self {
            Decoded::Json(value) => {
                serde_json::from_value(value).map_err(|e| UploadError::decode(context, e))
            }
            Decoded::Raw(bytes) => Err(UploadError::decode(
                context,
                format!("expected JSON, got {} raw byte(s)", bytes.len()),
            )),
        }
    }
}

/// Authenticated client for the Figshare account and upload APIs.
///
/// Cloning is cheap; clones share the underlying transport so the client can
/// be handed to part-transfer workers.
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    credential: Credential,
}

impl Clone for SessionClient {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: self.base_url.clone(),
            credential: self.credential.clone(),
        }
    }
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .finish()
    }
}

impl SessionClient {
    /// Create a client for `base_url` authenticating with `credential`.
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        }
    }

    /// Base URL the relative endpoints are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint relative to the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Issue a request against an endpoint relative to the base URL.
    pub fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> UploadResult<Decoded> {
        self.request_url(method, &self.url_for(endpoint), body)
    }

    /// Issue a request against an absolute URL (locations, upload service).
    pub fn request_url<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> UploadResult<Decoded> {
        let body = match body {
            Some(b) => Body::Json(
                serde_json::to_vec(b).map_err(|e| UploadError::decode("request body", e))?,
            ),
            None => Body::Empty,
        };
        self.send(method, url, body)
    }

    /// Send raw bytes verbatim.
    pub fn send_binary(&self, method: Method, url: &str, bytes: Vec<u8>) -> UploadResult<Decoded> {
        self.send(method, url, Body::Binary(bytes))
    }

    /// GET an endpoint and deserialize the JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> UploadResult<T> {
        self.request::<()>(Method::Get, endpoint, None)?
            .into_typed(endpoint)
    }

    /// GET an absolute URL and deserialize the JSON body.
    pub fn get_json_url<T: DeserializeOwned>(&self, url: &str) -> UploadResult<T> {
        self.request_url::<()>(Method::Get, url, None)?
            .into_typed(url)
    }

    /// POST a JSON body and deserialize the JSON response.
    pub fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> UploadResult<T> {
        self.request(Method::Post, endpoint, Some(body))?
            .into_typed(endpoint)
    }

    fn send(&self, method: Method, url: &str, body: Body) -> UploadResult<Decoded> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            authorization: self.credential.header_value(),
            body,
        };

        debug!(method = %method, url = %url, bytes = request.body.len(), "API request");

        let response = self.transport.execute(&request)?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            warn!(
                method = %method,
                url = %url,
                status = response.status,
                body = %body,
                "API request failed"
            );
            return Err(UploadError::RemoteApi {
                status: response.status,
                body,
            });
        }

        Ok(decode_body(response.body))
    }
}

fn decode_body(body: Vec<u8>) -> Decoded {
    match serde_json::from_slice(&body) {
        Ok(value) => Decoded::Json(value),
        Err(_) => Decoded::Raw(body),
    }
}
