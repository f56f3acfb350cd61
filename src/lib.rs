//! Muninn - Disk-backed replay cache for LLM API development
//!
//! This crate wraps an HTTP call boundary with a content-addressed,
//! folder-per-request disk cache, so repeated identical requests during
//! development replay from disk instead of hitting (and paying for) the
//! real API. Large string values — base64 attachments, long completions —
//! are externalized into shared "sidecar" files, keeping the cached JSON
//! small and human-readable.
//!
//! # Example
//!
//! ```rust,no_run
//! use muninn::{CacheConfig, CachingClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let client = CachingClient::new(
//!         CacheConfig::new()
//!             .cache_root(".llm-cache")
//!             .ttl(Duration::from_secs(3600)),
//!     );
//!
//!     let request = reqwest::Client::new()
//!         .post("https://api.example.com/v1/chat/completions")
//!         .json(&serde_json::json!({
//!             "model": "sonnet-4",
//!             "messages": [{"role": "user", "content": "What is in this PDF?"}],
//!         }))
//!         .build()?;
//!
//!     // First call hits the network and populates the cache;
//!     // identical calls within the TTL replay from disk.
//!     let response = client.send(request).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! # On-disk layout
//!
//! ```text
//! <cache-root>/requests/<key>/   one folder per request
//!     meta.json                  inspectable metadata
//!     request.json               request body (sidecar-encoded)
//!     response.json              response snapshot (sidecar-encoded)
//! <cache-root>/sidecars/
//!     <hash>.sidecar             deduplicated large strings
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod sidecar;
pub mod telemetry;
pub mod truncate;

// Re-export main types at crate root
pub use cache::{
    CacheMeta, CacheStats, CacheStore, CachedEntry, Frame, Provenance, ResponseBody,
    ResponseSnapshot, derive_key, normalize_body,
};
pub use client::{CacheConfig, CachingClient, HttpResponse, ReqwestTransport, Transport};
pub use error::{MuninnError, Result};
pub use truncate::truncate_strings;
