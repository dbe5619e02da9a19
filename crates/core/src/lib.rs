//! Core types and shared functionality for andante.
//!
//! This crate provides:
//! - Persistent response cache (SQLite index + payload blobs)
//! - Unified error types
//! - Layered application configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStore, StoreOverrides, compute_key};
pub use config::AppConfig;
pub use error::Error;
