//! Connection: the dispatch state machine.
//!
//! One `Connection` owns its pacing state and configuration. Each logical
//! send walks cache check → wait → send → classify, retrying transient
//! failures in a bounded loop. Calls on one connection are paced against a
//! shared last-send timestamp that only real network sends update, so
//! cache hits never consume the pacing budget.

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use andante_core::cache::{CacheStore, StoreOverrides, compute_key};
use andante_core::config::AppConfig;

use crate::error::Error;
use crate::headers;
use crate::options::{RequestOptions, RetryLimit};
use crate::response::HttpResponse;
use crate::transport::{PreparedRequest, ReqwestTransport, Transport, TransportError, TransportResponse};

/// Connection-scoped dispatch configuration. Set once at construction and
/// immutable for the connection's lifetime; per-call overrides live in
/// `RequestOptions` and never write back here.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Minimum spacing between any two real network sends.
    pub base_delay: Duration,
    /// Additional delay per retry attempt (linear backoff).
    pub retry_delay: Duration,
    /// Statuses that fail the call immediately; retrying cannot help.
    pub error_status_codes: HashSet<u16>,
    /// Statuses treated as rate-limit signals, retried like connection
    /// failures.
    pub rate_limit_status_codes: HashSet<u16>,
    /// Default retry budget.
    pub max_retries: RetryLimit,
    /// User-Agent for outgoing requests.
    pub user_agent: String,
    /// Per-request transport timeout.
    pub timeout: Duration,
}

/// Statuses that indicate the request itself is bad or the server is in a
/// state a retry won't fix.
pub fn default_error_status_codes() -> HashSet<u16> {
    HashSet::from([400, 401, 403, 404, 405, 406, 410, 418, 422, 451, 500, 501, 502, 503, 504])
}

/// Statuses that signal throttling: 429 Too Many Requests and 509
/// Bandwidth Limit Exceeded.
pub fn default_rate_limit_status_codes() -> HashSet<u16> {
    HashSet::from([429, 509])
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let defaults = AppConfig::default();
        let timeout = defaults.timeout();
        Self {
            base_delay: defaults.base_delay(),
            retry_delay: defaults.retry_delay(),
            error_status_codes: default_error_status_codes(),
            rate_limit_status_codes: default_rate_limit_status_codes(),
            max_retries: RetryLimit::from(defaults.retry_cap()),
            user_agent: defaults.user_agent,
            timeout,
        }
    }
}

/// A caller's logical request: method, URL, headers, body, plus the
/// per-call overrides.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::GET, url: url.into(), headers: Vec::new(), body: None, options: RequestOptions::default() }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

enum Classification {
    Success,
    HardError,
    RateLimited,
}

/// A paced, caching, retrying HTTP connection.
///
/// Dispatch is sequential per connection; drive several connections
/// independently for parallelism. Each keeps its own last-send timestamp
/// and there is no cross-connection rate budget.
pub struct Connection {
    transport: Box<dyn Transport>,
    config: ConnectionConfig,
    cache: CacheStore,
    last_send: Mutex<Option<Instant>>,
}

impl Connection {
    /// Create a connection with the production reqwest transport.
    pub fn new(config: ConnectionConfig, cache: CacheStore) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(&config.user_agent, config.timeout)?;
        Ok(Self::with_transport(Box::new(transport), config, cache))
    }

    /// Create a connection with an injected transport.
    pub fn with_transport(transport: Box<dyn Transport>, config: ConnectionConfig, cache: CacheStore) -> Self {
        Self { transport, config, cache, last_send: Mutex::new(None) }
    }

    /// Create a connection (and open its cache directory) from the layered
    /// application configuration.
    pub async fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let cache = CacheStore::open(&config.cache_dir, config.cache_enabled, config.cache_ttl()).await?;
        let connection_config = ConnectionConfig {
            base_delay: config.base_delay(),
            retry_delay: config.retry_delay(),
            max_retries: RetryLimit::from(config.retry_cap()),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        };
        Self::new(connection_config, cache)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// GET with connection defaults.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, Error> {
        self.send(RequestDescriptor::get(url)).await
    }

    /// GET with per-call overrides.
    pub async fn get_with(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, Error> {
        self.send(RequestDescriptor::get(url).with_options(options)).await
    }

    /// POST with connection defaults.
    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<HttpResponse, Error> {
        self.send(RequestDescriptor::post(url, body)).await
    }

    /// POST with per-call overrides.
    pub async fn post_with(&self, url: &str, body: impl Into<Bytes>, options: RequestOptions) -> Result<HttpResponse, Error> {
        self.send(RequestDescriptor::post(url, body).with_options(options)).await
    }

    /// Best-effort GET: terminal failures become `None` plus a warning.
    pub async fn get_silent(&self, url: &str) -> Result<Option<HttpResponse>, Error> {
        self.send_silent(RequestDescriptor::get(url)).await
    }

    /// Best-effort POST: terminal failures become `None` plus a warning.
    pub async fn post_silent(&self, url: &str, body: impl Into<Bytes>) -> Result<Option<HttpResponse>, Error> {
        self.send_silent(RequestDescriptor::post(url, body)).await
    }

    /// Run one logical send through the full state machine.
    pub async fn send(&self, request: RequestDescriptor) -> Result<HttpResponse, Error> {
        let url = parse_url(&request.url)?;
        let options = &request.options;
        let retries = options.max_retries.unwrap_or(self.config.max_retries);
        let store = self.cache.fork(StoreOverrides { enabled: options.cache, ttl: options.cache_ttl });
        let key = compute_key(url.as_str(), options.cache_key.as_deref().unwrap_or(""));

        if store.is_enabled() && store.has(&key).await? {
            match store.get(&key).await {
                Ok(payload) => match HttpResponse::decode(&payload) {
                    Ok(response) => {
                        tracing::debug!(%url, "cache hit");
                        return Ok(response);
                    }
                    Err(e) => tracing::warn!(%url, error = %e, "undecodable cache payload, refetching"),
                },
                // A damaged entry must never block forward progress.
                Err(e) if e.is_miss() => tracing::warn!(%url, error = %e, "cache entry vanished, refetching"),
                Err(e) => return Err(e.into()),
            }
        }

        let merged = headers::merge(
            headers::default_headers(&self.config.user_agent, options.referer.as_deref()),
            &request.headers,
        );
        let prepared = PreparedRequest { method: request.method.clone(), url, headers: merged, body: request.body.clone() };

        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            self.pace(attempt, started, options.deadline).await?;

            match self.send_once(&prepared, started, options.deadline).await? {
                Err(transport_err) => {
                    if retries.allows_retry(attempt) {
                        tracing::debug!(error = %transport_err, attempt, url = %prepared.url, "connection failure, retrying");
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::ConnectionExhausted { attempts: attempt + 1, source: transport_err });
                }
                Ok(response) => match self.classify(response.status) {
                    Classification::HardError => {
                        return Err(Error::Http {
                            status: response.status,
                            reason: response.reason.unwrap_or_default(),
                        });
                    }
                    Classification::RateLimited => {
                        if retries.allows_retry(attempt) {
                            tracing::debug!(status = response.status, attempt, url = %prepared.url, "rate limited, retrying");
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::RateLimitExhausted { status: response.status, attempts: attempt + 1 });
                    }
                    Classification::Success => {
                        let response = HttpResponse::from(response);
                        if store.is_enabled() {
                            let payload = response.encode().map_err(|e| Error::Encode(e.to_string()))?;
                            store.put(&key, &payload, None).await?;
                        }
                        return Ok(response);
                    }
                },
            }
        }
    }

    /// Same state machine, but every terminal failure except
    /// `InvalidRequest` is downgraded to a warning and an absent result.
    pub async fn send_silent(&self, request: RequestDescriptor) -> Result<Option<HttpResponse>, Error> {
        let url = request.url.clone();
        match self.send(request).await {
            Ok(response) => Ok(Some(response)),
            Err(err @ Error::InvalidRequest(_)) => Err(err),
            Err(err) => {
                tracing::warn!(url, error = %err, "request failed, continuing without a response");
                Ok(None)
            }
        }
    }

    /// Sleep out the remainder of this attempt's delay, measured from the
    /// connection's last real send.
    async fn pace(&self, attempt: u32, started: Instant, deadline: Option<Duration>) -> Result<(), Error> {
        let target = self.config.base_delay + self.config.retry_delay * attempt;
        let elapsed = {
            let last = self.last_send.lock().await;
            (*last).map(|at| at.elapsed())
        };

        let wait = match elapsed {
            Some(elapsed) if elapsed < target => target - elapsed,
            _ => return Ok(()),
        };

        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_sub(started.elapsed());
            if wait > remaining {
                return Err(Error::DeadlineExceeded);
            }
        }

        tracing::debug!(?wait, attempt, "pacing before send");
        tokio::time::sleep(wait).await;
        Ok(())
    }

    /// One real network send. The last-send timestamp is updated once the
    /// send completes, success or failure, and never on a cache hit.
    async fn send_once(
        &self, prepared: &PreparedRequest, started: Instant, deadline: Option<Duration>,
    ) -> Result<Result<TransportResponse, TransportError>, Error> {
        let result = match deadline {
            Some(deadline) => {
                let remaining = deadline
                    .checked_sub(started.elapsed())
                    .ok_or(Error::DeadlineExceeded)?;
                match tokio::time::timeout(remaining, self.transport.send(prepared)).await {
                    Ok(result) => result,
                    Err(_) => {
                        *self.last_send.lock().await = Some(Instant::now());
                        return Err(Error::DeadlineExceeded);
                    }
                }
            }
            None => self.transport.send(prepared).await,
        };

        *self.last_send.lock().await = Some(Instant::now());
        Ok(result)
    }

    fn classify(&self, status: u16) -> Classification {
        if self.config.error_status_codes.contains(&status) {
            Classification::HardError
        } else if self.config.rate_limit_status_codes.contains(&status) {
            Classification::RateLimited
        } else if status >= 400 {
            // Unclassified error codes are assumed non-transient.
            Classification::HardError
        } else {
            Classification::Success
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidRequest("empty URL".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| Error::InvalidRequest(format!("invalid URL {trimmed:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidRequest(format!("unsupported scheme: {scheme}"))),
    }
}
