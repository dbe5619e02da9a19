//! Per-call overrides.

use std::time::Duration;

/// Retry budget: extra attempts allowed beyond the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// Keep retrying until something else (a deadline, a hard error) stops
    /// the dispatch.
    Unlimited,
    /// Inclusive cap on retries; `Limited(0)` means one attempt, no retry.
    Limited(u32),
}

impl RetryLimit {
    /// Whether another attempt may follow the one that just completed
    /// (0-based).
    pub fn allows_retry(self, completed_attempt: u32) -> bool {
        match self {
            RetryLimit::Unlimited => true,
            RetryLimit::Limited(cap) => completed_attempt < cap,
        }
    }
}

impl Default for RetryLimit {
    fn default() -> Self {
        RetryLimit::Limited(5)
    }
}

impl From<Option<u32>> for RetryLimit {
    fn from(cap: Option<u32>) -> Self {
        match cap {
            Some(cap) => RetryLimit::Limited(cap),
            None => RetryLimit::Unlimited,
        }
    }
}

/// Overrides that shadow the connection's defaults for a single call.
///
/// Every field is optional; unset fields fall back to the connection. The
/// overlay is resolved once at dispatch entry and never mutates shared
/// state, so overrides cannot leak into later calls.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Use the cache for this call.
    pub cache: Option<bool>,
    /// Lifetime for a cache entry written by this call.
    pub cache_ttl: Option<Duration>,
    /// Disambiguator mixed into the cache key, for callers that must cache
    /// one URL under several variants.
    pub cache_key: Option<String>,
    /// Retry budget for this call.
    pub max_retries: Option<RetryLimit>,
    /// Referer header for this call.
    pub referer: Option<String>,
    /// Extra headers; these override same-named defaults.
    pub headers: Vec<(String, String)>,
    /// Give up (wait or in-flight send included) once this much wall-clock
    /// time has passed since dispatch entry.
    pub deadline: Option<Duration>,
}
