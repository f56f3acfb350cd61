//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn cache operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `method` — HTTP method of the wrapped request (e.g. "POST")

/// Total cache hits served without a network call.
///
/// Labels: `method`.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total cache misses (no entry on disk for the derived key).
///
/// Labels: `method`.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total entries found on disk but older than the configured TTL.
///
/// Labels: `method`.
pub const CACHE_EXPIRED_TOTAL: &str = "muninn_cache_expired_total";

/// Total cache entries written (miss and expiry paths both count).
///
/// Labels: `method`.
pub const CACHE_WRITES_TOTAL: &str = "muninn_cache_writes_total";

/// Total requests that bypassed the cache entirely (disabled, non-POST,
/// or a body that is not parseable JSON).
///
/// Labels: `reason` ("disabled" | "method" | "body").
pub const CACHE_BYPASS_TOTAL: &str = "muninn_cache_bypass_total";
