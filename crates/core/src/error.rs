//! Unified error types for the andante cache layer.

use tokio_rusqlite::rusqlite;

/// Unified error type for cache storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No valid (unexpired) entry exists for the key.
    #[error("cache miss: no valid entry for key {0}")]
    NotFound(String),

    /// An index row exists but the payload is missing or unreadable.
    #[error("corrupt cache entry for key {0}")]
    CorruptEntry(String),

    /// Key is not a hex digest and cannot name a payload blob.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// Database operation failed.
    #[error("cache database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache migration failed: {0}")]
    MigrationFailed(String),

    /// Blob file I/O failed.
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl Error {
    /// True for errors a dispatcher must treat as a plain miss rather than
    /// propagate: a damaged entry never blocks a real request.
    pub fn is_miss(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::CorruptEntry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("abc123".to_string());
        assert!(err.to_string().contains("cache miss"));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_miss_classification() {
        assert!(Error::NotFound("k".into()).is_miss());
        assert!(Error::CorruptEntry("k".into()).is_miss());
        assert!(!Error::MigrationFailed("boom".into()).is_miss());
    }
}
