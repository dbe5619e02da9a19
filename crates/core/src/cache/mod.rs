//! Persistent, expiring response cache.
//!
//! The cache is split in two, so that existence/expiry probes never pay a
//! payload deserialization cost:
//!
//! - a SQLite index (`cache_metadata.db`, WAL mode, async access via
//!   tokio-rusqlite) mapping each key to its expiration timestamp
//! - one payload blob file per entry, named by the key, next to the index
//!
//! Expired entries are evicted lazily on read; there is no background
//! sweeper. The index file doubles as the marker by which housekeeping
//! tools recognize a cache directory.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::compute_key;
pub use store::{CacheStore, METADATA_DB, StoreOverrides};
