//! Index row operations.
//!
//! The index maps each cache key to its expiration timestamp, separate from
//! the payload blobs, so existence/expiry probes never touch a payload.
//! Timestamps are RFC 3339 UTC with fixed microsecond precision so that
//! string comparison agrees with chronological order.

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Format a timestamp the way the index stores it.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl CacheDb {
    /// Look up the expiration timestamp for a key.
    ///
    /// Returns None if no row exists. Expiry is not evaluated here; callers
    /// compare against their own notion of now.
    pub async fn lookup_expiry(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT expires_at FROM entries WHERE key = ?1", params![key], |row| {
                    row.get(0)
                });

                match result {
                    Ok(expires_at) => Ok(Some(expires_at)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the index row for a key.
    pub async fn upsert_entry(&self, key: &str, expires_at: DateTime<Utc>) -> Result<(), Error> {
        let key = key.to_string();
        let expires_at = format_ts(expires_at);
        let stored_at = format_ts(Utc::now());

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (key, expires_at, stored_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                         expires_at = excluded.expires_at,
                         stored_at = excluded.stored_at",
                    params![key, expires_at, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the index row for a key. Returns true if a row was removed.
    pub async fn remove_entry(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let removed = conn.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List keys whose entries expired at or before now.
    pub async fn expired_keys(&self) -> Result<Vec<String>, Error> {
        let now = format_ts(Utc::now());
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE expires_at <= ?1")?;
                let keys = stmt
                    .query_map(params![now], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Count all index rows, expired or not.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
