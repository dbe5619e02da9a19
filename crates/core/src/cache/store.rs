//! Durable key→blob store with expiration.
//!
//! A `CacheStore` couples one index database with a directory of payload
//! blobs. It knows nothing about HTTP; payloads are opaque bytes. Writes
//! land the blob before the index row becomes visible, so a crash between
//! the two steps never produces a row that reads as valid for a missing
//! blob (and `get` defends against that case regardless).

use super::connection::CacheDb;
use super::entries::format_ts;
use crate::Error;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Index file name. Housekeeping tools recognize a cache directory by the
/// presence of this file; keep the CLI's directory scan in sync with it.
pub const METADATA_DB: &str = "cache_metadata.db";

/// Per-call overrides for a forked store view.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOverrides {
    /// Override the enabled flag for the forked view.
    pub enabled: Option<bool>,
    /// Override the default TTL for the forked view.
    pub ttl: Option<Duration>,
}

/// Persistent, expiring key→blob store.
///
/// Cloning (or forking) shares the same backing index and blob directory;
/// the enabled flag and default TTL are per-view and never mutate a parent.
#[derive(Debug, Clone)]
pub struct CacheStore {
    db: CacheDb,
    root: PathBuf,
    enabled: bool,
    default_ttl: Duration,
}

impl CacheStore {
    /// Open (creating if necessary) a cache directory and its index.
    pub async fn open(root: impl AsRef<Path>, enabled: bool, default_ttl: Duration) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        let db = CacheDb::open(root.join(METADATA_DB)).await?;
        Ok(Self { db, root, enabled, default_ttl })
    }

    /// Whether calls through this view should use the cache at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Default TTL applied when `put` is called without an explicit one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Directory holding the index and payload blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A logically independent view over the same backing storage.
    ///
    /// Lets a single call disable caching or change the TTL without
    /// touching the settings of the connection that owns the parent.
    pub fn fork(&self, overrides: StoreOverrides) -> CacheStore {
        CacheStore {
            db: self.db.clone(),
            root: self.root.clone(),
            enabled: overrides.enabled.unwrap_or(self.enabled),
            default_ttl: overrides.ttl.unwrap_or(self.default_ttl),
        }
    }

    /// True iff a valid (unexpired) entry exists for the key.
    ///
    /// An expired row is evicted eagerly, index row and blob both. A fresh
    /// row whose blob has gone missing is treated as absent.
    pub async fn has(&self, key: &str) -> Result<bool, Error> {
        check_key(key)?;

        let Some(expires_at) = self.db.lookup_expiry(key).await? else {
            return Ok(false);
        };

        if expires_at <= format_ts(Utc::now()) {
            tracing::debug!(key, "evicting expired cache entry");
            self.remove(key).await?;
            return Ok(false);
        }

        if !tokio::fs::try_exists(self.blob_path(key)).await? {
            tracing::debug!(key, "index row without payload blob, treating as miss");
            self.db.remove_entry(key).await?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Read the payload for a valid entry.
    ///
    /// Fails with `NotFound` when no unexpired entry exists and with
    /// `CorruptEntry` when the index says one does but the blob cannot be
    /// read back.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        check_key(key)?;

        let Some(expires_at) = self.db.lookup_expiry(key).await? else {
            return Err(Error::NotFound(key.to_string()));
        };

        if expires_at <= format_ts(Utc::now()) {
            self.remove(key).await?;
            return Err(Error::NotFound(key.to_string()));
        }

        match tokio::fs::read(self.blob_path(key)).await {
            Ok(payload) => Ok(payload),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::CorruptEntry(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a payload under the key with the given TTL (default TTL when
    /// None). Overwrites any previous entry for the key.
    pub async fn put(&self, key: &str, payload: &[u8], ttl: Option<Duration>) -> Result<(), Error> {
        check_key(key)?;
        let ttl = ttl.unwrap_or(self.default_ttl);

        // Blob first, index row second. The rename keeps the write atomic
        // per key: concurrent writers race to last-writer-wins, never to a
        // half-written blob.
        let path = self.blob_path(key);
        let tmp = self.root.join(format!("{key}.bin.tmp"));
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;

        self.db.upsert_entry(key, expiry(ttl)).await
    }

    /// Delete every expired entry, blobs included. Returns the count.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let keys = self.db.expired_keys().await?;
        let purged = keys.len() as u64;
        for key in keys {
            self.remove(&key).await?;
        }
        Ok(purged)
    }

    /// Count all index rows, expired or not.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.db.entry_count().await
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.bin"))
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.db.remove_entry(key).await?;
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn expiry(ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::MAX);
    Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Keys name blob files on disk; only hex digests are acceptable.
fn check_key(key: &str) -> Result<(), Error> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}
