//! On-disk cache store.
//!
//! Owns the cache directory tree:
//!
//! ```text
//! <root>/requests/<key>/
//!     meta.json       plain JSON, cheap to inspect
//!     request.json    sidecar-encoded request body
//!     response.json   sidecar-encoded response snapshot
//! <root>/sidecars/
//!     <hash>.sidecar  one file per unique externalized string
//! ```
//!
//! The sidecar directory is shared across all entries, so identical large
//! payloads reused by different requests are stored once.
//!
//! # Error discipline
//!
//! Reads degrade: a missing, truncated, or unparsable entry is a cache miss
//! (with a warning), never an error. Writes propagate: losing a cache write
//! silently would misrepresent every later read.
//!
//! # Concurrency
//!
//! Two concurrent misses for the same key both write the entry; the second
//! write wins wholesale. Entry files are small and rewritten together, and
//! sidecars are content-addressed, so the race is harmless and goes
//! uncoordinated on purpose.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::sidecar::{self, DEFAULT_THRESHOLD, SidecarOptions};
use crate::{MuninnError, Result};

use super::entry::{
    CacheMeta, CachedEntry, Provenance, ResponseSnapshot, SUMMARY_MAX_CHARS,
};
use super::key::derive_key;

/// Subdirectory holding per-request entry folders.
const REQUESTS_DIR: &str = "requests";

/// Subdirectory holding shared sidecar files.
const SIDECARS_DIR: &str = "sidecars";

const META_FILE: &str = "meta.json";
const REQUEST_FILE: &str = "request.json";
const RESPONSE_FILE: &str = "response.json";

/// Disk-backed request/response cache store.
pub struct CacheStore {
    root: PathBuf,
    threshold: usize,
}

impl CacheStore {
    /// Create a store rooted at `root`. Nothing is created on disk until
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Create a store at the default root (`~/.cache/muninn`).
    pub fn at_default_root() -> Self {
        Self::new(default_root())
    }

    /// Set the sidecar externalization threshold.
    pub fn threshold(mut self, chars: usize) -> Self {
        self.threshold = chars;
        self
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder of the entry for `key`.
    pub fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(REQUESTS_DIR).join(key)
    }

    /// The shared sidecar directory.
    pub fn sidecar_dir(&self) -> PathBuf {
        self.root.join(SIDECARS_DIR)
    }

    fn sidecar_options(&self) -> SidecarOptions {
        SidecarOptions::new()
            .sidecar_dir(self.sidecar_dir())
            .threshold(self.threshold)
    }

    /// Look up the entry for `(url, body)`.
    ///
    /// Returns `None` when either `meta.json` or `response.json` is missing
    /// or fails to parse — corrupted and partial entries are misses, never
    /// errors.
    pub fn lookup(&self, url: &str, body: &Value) -> Option<CachedEntry> {
        self.lookup_key(&derive_key(url, body))
    }

    /// Look up an entry directly by key.
    pub fn lookup_key(&self, key: &str) -> Option<CachedEntry> {
        let dir = self.entry_dir(key);

        let meta_path = dir.join(META_FILE);
        let meta_text = read_optional(&meta_path)?;
        let meta: CacheMeta = match serde_json::from_str(&meta_text) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "corrupt cache metadata, treating as miss");
                return None;
            }
        };

        let response_path = dir.join(RESPONSE_FILE);
        if !response_path.exists() {
            return None;
        }
        let response_value = match sidecar::read_file(&response_path, &self.sidecar_options()) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %response_path.display(), error = %e, "unreadable response snapshot, treating as miss");
                return None;
            }
        };
        let response: ResponseSnapshot = match serde_json::from_value(response_value) {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %response_path.display(), error = %e, "corrupt response snapshot, treating as miss");
                return None;
            }
        };

        Some(CachedEntry { meta, response })
    }

    /// Read back the sidecar-decoded request body for `key`.
    ///
    /// Inspection aid for reproducing cached requests; same miss discipline
    /// as [`lookup`](Self::lookup).
    pub fn load_request(&self, key: &str) -> Option<Value> {
        let path = self.entry_dir(key).join(REQUEST_FILE);
        if !path.exists() {
            return None;
        }
        match sidecar::read_file(&path, &self.sidecar_options()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable request snapshot");
                None
            }
        }
    }

    /// Write a complete entry for `(url, request_body)`, returning the key.
    ///
    /// Creates the entry folder, extracts `model`/`provider` from the body's
    /// top level, derives `success` and `errorMessage` from the response,
    /// and writes metadata directly plus both snapshots through the sidecar
    /// codec. Replaces any existing entry wholesale (last writer wins).
    pub fn store(
        &self,
        url: &str,
        method: &str,
        request_body: &Value,
        response: &ResponseSnapshot,
        provenance: &Provenance,
    ) -> Result<String> {
        let key = derive_key(url, request_body);
        let dir = self.entry_dir(&key);
        fs::create_dir_all(&dir).map_err(|e| MuninnError::io(&dir, e))?;

        let meta = build_meta(&key, url, method, request_body, response, provenance);
        let meta_path = dir.join(META_FILE);
        let meta_text = serde_json::to_string_pretty(&meta)?;
        fs::write(&meta_path, meta_text).map_err(|e| MuninnError::io(&meta_path, e))?;

        let opts = self.sidecar_options();
        sidecar::write_file(&dir.join(REQUEST_FILE), request_body, &opts)?;
        sidecar::write_file(&dir.join(RESPONSE_FILE), &serde_json::to_value(response)?, &opts)?;

        Ok(key)
    }

    /// Compute statistics about the cache.
    pub fn stats(&self) -> std::io::Result<CacheStats> {
        let requests = self.root.join(REQUESTS_DIR);
        let mut entries = 0usize;
        let mut total_bytes = 0u64;

        if requests.exists() {
            for entry in fs::read_dir(&requests)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                entries += 1;
                for file in fs::read_dir(entry.path())? {
                    let file = file?;
                    total_bytes += file.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }
        }

        let sidecars = self.sidecar_dir();
        if sidecars.exists() {
            for file in fs::read_dir(&sidecars)? {
                let file = file?;
                total_bytes += file.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(CacheStats {
            entries,
            total_bytes,
        })
    }

    /// Remove all cached entries and sidecars, returning what was purged.
    pub fn clear(&self) -> std::io::Result<CacheStats> {
        let stats = self.stats()?;
        for dir in [self.root.join(REQUESTS_DIR), self.sidecar_dir()] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(stats)
    }
}

/// Default cache root: `~/.cache/muninn`.
pub fn default_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("muninn")
}

/// Read a file that is allowed to be absent.
///
/// `None` quietly for not-found, `None` with a warning for anything else.
fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache file");
            None
        }
    }
}

/// Assemble the metadata record for one entry.
fn build_meta(
    key: &str,
    url: &str,
    method: &str,
    request_body: &Value,
    response: &ResponseSnapshot,
    provenance: &Provenance,
) -> CacheMeta {
    let success = (200..300).contains(&response.status);
    let error_message = if success {
        None
    } else {
        response
            .body
            .as_json()
            .and_then(|body| body.get("error"))
            .and_then(|error| error.get("message"))
            .and_then(|message| message.as_str())
            .map(str::to_string)
    };

    CacheMeta {
        key: key.to_string(),
        url: url.to_string(),
        method: method.to_string(),
        model: request_body
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string),
        provider: request_body.get("provider").cloned(),
        status: response.status,
        status_text: response.status_text.clone(),
        timestamp: response.timestamp,
        timestamp_iso: iso_timestamp(response.timestamp),
        response_summary: summarize(&response.body.to_text()),
        success,
        error_message,
        stack_trace: provenance.stack_trace(),
        caller_file: provenance.caller_file(),
    }
}

/// Render epoch milliseconds as ISO-8601 with millisecond precision.
fn iso_timestamp(epoch_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Bound a response body preview to [`SUMMARY_MAX_CHARS`] characters.
fn summarize(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SUMMARY_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Statistics about the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries.
    pub entries: usize,
    /// Total size of entry files and sidecars, in bytes.
    pub total_bytes: u64,
}

impl CacheStats {
    /// Format `total_bytes` as a human-readable string.
    pub fn human_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * KB;

        if self.total_bytes >= MB {
            format!("{:.1} MiB", self.total_bytes as f64 / MB as f64)
        } else if self.total_bytes >= KB {
            format!("{:.1} KiB", self.total_bytes as f64 / KB as f64)
        } else {
            format!("{} B", self.total_bytes)
        }
    }
}
