//! The caching wrapper itself.

use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::cache::entry::Provenance;
use crate::cache::store::CacheStore;
use crate::telemetry;

use super::CacheConfig;
use super::transport::{HttpResponse, ReqwestTransport, Transport};

/// HTTP client wrapper that replays cached responses.
///
/// Construct once and reuse; the store inside is just a directory handle.
///
/// ```rust,no_run
/// use muninn::{CacheConfig, CachingClient};
///
/// #[tokio::main]
/// async fn main() -> muninn::Result<()> {
///     let client = CachingClient::new(CacheConfig::new());
///     let request = reqwest::Client::new()
///         .post("https://api.example.com/v1/chat/completions")
///         .json(&serde_json::json!({"model": "sonnet-4", "messages": []}))
///         .build()?;
///
///     let response = client.send(request).await?;
///     println!("{}", response.text());
///     Ok(())
/// }
/// ```
pub struct CachingClient {
    config: CacheConfig,
    store: CacheStore,
    transport: Arc<dyn Transport>,
}

impl CachingClient {
    /// Create a client over the default reqwest transport.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::default()))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: CacheConfig, transport: Arc<dyn Transport>) -> Self {
        let store = CacheStore::new(config.cache_root.clone()).threshold(config.threshold);
        Self {
            config,
            store,
            transport,
        }
    }

    /// The underlying cache store (for stats, purge, inspection).
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Send a request through the cache.
    ///
    /// Provenance is captured at this call site, synchronously, before any
    /// suspension — stored entries point at the logical caller rather than
    /// an executor frame.
    #[track_caller]
    pub fn send(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<HttpResponse>> + Send + '_ {
        let provenance = Provenance::capture();
        self.send_with_provenance(request, provenance)
    }

    /// Send a request through the cache with an explicit provenance token.
    ///
    /// Cacheable requests (POST with a JSON body, caching enabled) are
    /// served from a fresh entry when one exists; otherwise the transport
    /// is invoked and the captured response persisted. Anything else passes
    /// through untouched. Transport errors propagate and leave no entry
    /// behind, so the next identical request retries the network instead of
    /// replaying a failure.
    pub async fn send_with_provenance(
        &self,
        request: reqwest::Request,
        provenance: Provenance,
    ) -> Result<HttpResponse> {
        if !self.config.enabled {
            metrics::counter!(telemetry::CACHE_BYPASS_TOTAL, "reason" => "disabled").increment(1);
            return self.transport.send(request).await;
        }
        if request.method() != reqwest::Method::POST {
            metrics::counter!(telemetry::CACHE_BYPASS_TOTAL, "reason" => "method").increment(1);
            return self.transport.send(request).await;
        }
        // Streaming bodies cannot be keyed on; only buffered ones qualify.
        let Some(bytes) = request.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec) else {
            metrics::counter!(telemetry::CACHE_BYPASS_TOTAL, "reason" => "body").increment(1);
            return self.transport.send(request).await;
        };
        let Ok(body) = serde_json::from_slice::<Value>(&bytes) else {
            metrics::counter!(telemetry::CACHE_BYPASS_TOTAL, "reason" => "body").increment(1);
            debug!(url = %request.url(), "request body is not JSON, bypassing cache");
            return self.transport.send(request).await;
        };

        let url = request.url().to_string();
        let method = request.method().as_str().to_string();

        match self.store.lookup(&url, &body) {
            Some(entry) => {
                let age_ms = entry.age_ms(now_ms());
                let ttl_ms = self.config.ttl.as_millis() as u64;
                if age_ms < ttl_ms {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "method" => method.clone())
                        .increment(1);
                    debug!(key = %entry.meta.key, age_ms, "cache hit, replaying stored response");
                    return Ok(HttpResponse::from_snapshot(&entry.response));
                }
                metrics::counter!(telemetry::CACHE_EXPIRED_TOTAL, "method" => method.clone())
                    .increment(1);
                debug!(key = %entry.meta.key, age_ms, ttl_ms, "cache entry expired, refetching");
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "method" => method.clone())
                    .increment(1);
                debug!(%url, "cache miss");
            }
        }

        let response = self.transport.send(request).await?;

        let snapshot = response.to_snapshot(now_ms());
        let key = self
            .store
            .store(&url, &method, &body, &snapshot, &provenance)?;
        metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "method" => method).increment(1);
        debug!(%key, status = snapshot.status, "cached response");

        Ok(response)
    }
}

/// Current time in epoch milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
