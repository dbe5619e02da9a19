//! HTTP transport seam.
//!
//! The dispatcher only classifies results; everything below the wire
//! (pooling, TLS, redirects, decompression) is delegated to reqwest behind
//! the `Transport` trait so tests can inject a scripted transport.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use url::Url;

/// Maximum redirects followed by the built-in transport.
const MAX_REDIRECTS: usize = 5;

/// A fully resolved outgoing request, ready for the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

/// What came back from the wire, reduced to what classification needs.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub final_url: String,
    pub body: Bytes,
}

/// Transport-level failures. These never carry an HTTP status; a response
/// with an error status is a classification concern, not a transport one.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timeout")]
    Timeout,

    #[error("connection error: {0}")]
    Connect(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TransportError::Timeout } else { TransportError::Connect(err.to_string()) }
    }
}

/// One network send. Implementations must not retry internally; the
/// dispatcher owns the retry loop.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError>;
}

/// The production transport, backed by a pooled reqwest client.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(name, "skipping malformed header"),
            }
        }

        let mut outgoing = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            outgoing = outgoing.body(body.clone());
        }

        let response = outgoing.send().await?;

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await?;

        Ok(TransportResponse { status: status.as_u16(), reason, headers, final_url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_builds() {
        let transport = ReqwestTransport::new("test-agent/1.0", Duration::from_secs(5));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "request timeout");
        assert!(TransportError::Connect("refused".into()).to_string().contains("refused"));
    }
}
