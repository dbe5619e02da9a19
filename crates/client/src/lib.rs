//! Request dispatch for andante.
//!
//! This crate orchestrates outbound GET/POST calls: it resolves cache
//! hits, paces real network sends, classifies responses, retries transient
//! failures with linear backoff, and writes successful responses back into
//! the cache store provided by `andante-core`.

pub mod connection;
pub mod error;
pub mod headers;
pub mod options;
pub mod response;
pub mod transport;

pub use connection::{Connection, ConnectionConfig, RequestDescriptor};
pub use error::Error;
pub use options::{RequestOptions, RetryLimit};
pub use response::HttpResponse;
pub use transport::{PreparedRequest, ReqwestTransport, Transport, TransportError, TransportResponse};

pub use reqwest::Method;
