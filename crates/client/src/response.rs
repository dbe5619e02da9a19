//! Serializable response artifact.
//!
//! This is what lands in the cache store and what callers get back,
//! whether the dispatch was served from disk or from the wire. Payload
//! blobs are MessagePack so re-reads stay cheap.

use crate::transport::TransportResponse;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub final_url: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// First header value matching the name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Encode for storage as a cache payload blob.
    pub fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    /// Decode a cache payload blob.
    pub fn decode(payload: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(payload)
    }
}

impl From<TransportResponse> for HttpResponse {
    fn from(response: TransportResponse) -> Self {
        Self {
            status: response.status,
            reason: response.reason,
            headers: response.headers,
            final_url: response.final_url,
            body: response.body.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HttpResponse {
        HttpResponse {
            status: 200,
            reason: Some("OK".to_string()),
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            final_url: "https://example.com/".to_string(),
            body: b"<html>hi</html>".to_vec(),
        }
    }

    #[test]
    fn test_encode_decode() {
        let response = sample();
        let payload = response.encode().unwrap();
        assert_eq!(HttpResponse::decode(&payload).unwrap(), response);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(HttpResponse::decode(b"definitely not msgpack").is_err());
    }

    #[test]
    fn test_text_lossy() {
        let mut response = sample();
        response.body = vec![0x68, 0x69, 0xFF];
        assert!(response.text().starts_with("hi"));
    }

    #[test]
    fn test_header_lookup() {
        let response = sample();
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert!(response.header("etag").is_none());
    }
}
