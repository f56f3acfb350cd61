//! Transport seam and the buffered response type.
//!
//! [`Transport`] is the boundary the cache wraps: one call in, one buffered
//! response out. [`ReqwestTransport`] is the production implementation;
//! tests substitute their own to count invocations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::cache::entry::{ResponseBody, ResponseSnapshot};

/// The underlying HTTP call primitive.
///
/// Implementations perform exactly one request and return the response
/// fully buffered. The cache layer imposes no timeout of its own — timeout
/// behaviour belongs to the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and buffer the complete response.
    async fn send(&self, request: reqwest::Request) -> Result<HttpResponse>;
}

/// Production transport backed by a [`reqwest::Client`].
#[derive(Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap an existing client (connection pools, proxies, and timeouts
    /// configured by the caller are preserved).
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: reqwest::Request) -> Result<HttpResponse> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// A fully buffered HTTP response.
///
/// Both live and replayed responses use this type, which is what makes the
/// two observably identical: status, status text, headers, and body bytes
/// carry over exactly. The body is always consumable — no stream to exhaust.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) status_text: String,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) body: Vec<u8>,
}

impl HttpResponse {
    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// HTTP status text.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All response headers (names lowercased).
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// A single header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Reconstruct a response from a stored snapshot.
    pub(crate) fn from_snapshot(snapshot: &ResponseSnapshot) -> Self {
        Self {
            status: snapshot.status,
            status_text: snapshot.status_text.clone(),
            headers: snapshot.headers.clone(),
            body: snapshot.body.to_text().into_bytes(),
        }
    }

    /// Capture this response as a snapshot taken at `timestamp_ms`.
    ///
    /// The body is stored structurally when it parses as JSON, as raw text
    /// otherwise — never both.
    pub(crate) fn to_snapshot(&self, timestamp_ms: u64) -> ResponseSnapshot {
        let body = match serde_json::from_slice::<serde_json::Value>(&self.body) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(self.text()),
        };
        ResponseSnapshot {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body,
            timestamp: timestamp_ms,
        }
    }
}
