//! Application configuration with layered loading.
//!
//! Configuration management using figment for layered loading from
//! multiple sources:
//!
//! 1. Environment variables (ANDANTE_*)
//! 2. TOML config file (if ANDANTE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ANDANTE_*)
/// 2. TOML config file (if ANDANTE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the cache index and payload blobs.
    ///
    /// Set via ANDANTE_CACHE_DIR. Process-relative by default.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Whether responses are cached at all by default.
    ///
    /// Set via ANDANTE_CACHE_ENABLED.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Default cache entry lifetime in seconds.
    ///
    /// Set via ANDANTE_CACHE_TTL_SECS.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Minimum spacing between real network sends, in milliseconds.
    ///
    /// Set via ANDANTE_BASE_DELAY_MS.
    #[serde(default)]
    pub base_delay_ms: u64,

    /// Additional delay per retry attempt, in milliseconds.
    ///
    /// Set via ANDANTE_RETRY_DELAY_MS.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Retry attempts allowed beyond the first. Negative means unlimited.
    ///
    /// Set via ANDANTE_MAX_RETRIES.
    #[serde(default = "default_max_retries")]
    pub max_retries: i64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via ANDANTE_TIMEOUT_MS.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for outgoing requests.
    ///
    /// Set via ANDANTE_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./request_cache")
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> i64 {
    5
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:139.0) Gecko/20100101 Firefox/139.0".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            base_delay_ms: 0,
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Base inter-request delay as a Duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Per-attempt retry delay increment as a Duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Request timeout as a Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry cap, with negative values meaning unlimited.
    pub fn retry_cap(&self) -> Option<u32> {
        u32::try_from(self.max_retries).ok()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ANDANTE_`
    /// 2. TOML file from `ANDANTE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ANDANTE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(Env::prefixed("ANDANTE_").map(|key| key.as_str().to_lowercase().into()));

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("./request_cache"));
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.base_delay_ms, 0);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_duration_accessors() {
        let config = AppConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_retry_cap() {
        let config = AppConfig::default();
        assert_eq!(config.retry_cap(), Some(5));

        let unlimited = AppConfig { max_retries: -1, ..Default::default() };
        assert_eq!(unlimited.retry_cap(), None);
    }
}
