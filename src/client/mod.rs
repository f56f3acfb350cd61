//! Caching HTTP client — the wrapper around the real transport.
//!
//! [`CachingClient`] intercepts outbound requests, consults the
//! [`CacheStore`](crate::CacheStore), and serves fresh entries without a
//! network call. Misses and stale entries go to the real transport; the
//! captured response is persisted and handed back unchanged. Callers cannot
//! tell a replayed response from a live one by status, headers, or body —
//! the one guaranteed difference is that no network transaction occurred.
//!
//! # What gets cached
//!
//! Only POST requests whose body parses as JSON. Everything else — caching
//! disabled, other methods, absent or streaming bodies, non-JSON payloads —
//! passes straight through to the transport untouched.

mod caching;
mod transport;

pub use caching::CachingClient;
pub use transport::{HttpResponse, ReqwestTransport, Transport};

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::store::default_root;
use crate::sidecar::DEFAULT_THRESHOLD;

/// Configuration for the caching client.
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .cache_root("/tmp/muninn-cache")
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is active at all. Default: true.
    pub enabled: bool,
    /// How long a stored entry counts as fresh. Default: 1 hour.
    pub ttl: Duration,
    /// Cache root directory. Default: `~/.cache/muninn`.
    pub cache_root: PathBuf,
    /// Sidecar externalization threshold in characters. Default: 1000.
    pub threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            cache_root: default_root(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// Create a config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the freshness window for stored entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the cache root directory.
    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Set the sidecar externalization threshold.
    pub fn threshold(mut self, chars: usize) -> Self {
        self.threshold = chars;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = CacheConfig::new();
        assert!(config.enabled);
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert!(config.cache_root.ends_with("muninn"));
    }

    #[test]
    fn config_builder_pattern() {
        let config = CacheConfig::new()
            .enabled(false)
            .ttl(Duration::from_millis(5))
            .cache_root("/tmp/x")
            .threshold(10);
        assert!(!config.enabled);
        assert_eq!(config.ttl, Duration::from_millis(5));
        assert_eq!(config.cache_root, PathBuf::from("/tmp/x"));
        assert_eq!(config.threshold, 10);
    }
}
