//! Dispatcher error types.

use crate::transport::TransportError;

/// Errors surfaced by a dispatch call.
///
/// Retry handling is internal to one dispatch; these are only the terminal
/// outcomes. Cache misses and damaged cache entries never appear here —
/// the dispatcher falls through to a real send instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed URL. Never retried, and the only error the
    /// silent dispatch variant refuses to swallow.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response status in the hard-error set, or an unclassified status
    /// >= 400. Not retried.
    #[error("server returned error status {status}: {reason}")]
    Http { status: u16, reason: String },

    /// Rate-limit statuses kept coming until the retry limit ran out.
    #[error("rate limited until retries ran out, last status {status} after {attempts} attempts")]
    RateLimitExhausted { status: u16, attempts: u32 },

    /// Transport-level failures kept coming until the retry limit ran out.
    #[error("connection failed {attempts} times: {source}")]
    ConnectionExhausted { attempts: u32, source: TransportError },

    /// The caller-supplied deadline elapsed during a wait or in-flight send.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Response could not be encoded for caching.
    #[error("failed to encode response for caching: {0}")]
    Encode(String),

    /// Cache database failure (not a miss).
    #[error(transparent)]
    Cache(#[from] andante_core::Error),

    /// Transport construction failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Http { status: 404, reason: "Not Found".into() };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("Not Found"));

        let err = Error::RateLimitExhausted { status: 429, attempts: 6 };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("6 attempts"));
    }
}
