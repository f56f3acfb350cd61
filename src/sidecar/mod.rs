//! Sidecar codec — size-bounded JSON with externalized large strings.
//!
//! [`encode`] turns an arbitrary [`serde_json::Value`] into pretty-printed
//! JSON text in which every string leaf longer than a threshold has been
//! moved to its own content-addressed file (a *sidecar*) and replaced by a
//! short reference placeholder. [`decode`] reverses the process. The main
//! JSON file stays small enough to open in an editor even when the original
//! value carried multi-megabyte base64 attachments.
//!
//! # Placeholder grammar
//!
//! `__SIDECAR__:<hash>`, optionally preceded by a literal data-URL prefix
//! matching `data:<mediatype>;base64,`. For data-URL-shaped strings only the
//! base64 payload is externalized; the prefix stays inline so a reader
//! skimming the main file can still see "this is a redacted PDF" without
//! dereferencing anything.
//!
//! # Content addressing
//!
//! Sidecar files are named by the truncated SHA-256 of their own content
//! (the same digest discipline as [`derive_key`](crate::cache::derive_key)),
//! so byte-identical large strings from different entries are stored exactly
//! once and concurrent writers of the same value race harmlessly.
//!
//! # Failure modes
//!
//! Encoding never fails due to content. Filesystem write failures propagate.
//! A missing sidecar on decode logs a warning and leaves the placeholder in
//! place — partial data loss never blocks reading the rest of a file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{MuninnError, Result};

/// Marker embedded in place of an externalized string.
pub const SIDECAR_MARKER: &str = "__SIDECAR__:";

/// File extension of externalized values.
pub const SIDECAR_EXT: &str = "sidecar";

/// Default externalization threshold, in characters.
pub const DEFAULT_THRESHOLD: usize = 1000;

/// Hex length of a sidecar content hash (truncated SHA-256).
const HASH_LEN: usize = 16;

/// Options for the sidecar codec.
///
/// ```rust
/// # use muninn::sidecar::SidecarOptions;
/// let opts = SidecarOptions::new()
///     .sidecar_dir("/tmp/sidecars")
///     .threshold(500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SidecarOptions {
    /// Directory holding sidecar files. Default: the directory of the main
    /// file the value is encoded for.
    pub sidecar_dir: Option<PathBuf>,
    /// Externalization threshold in characters. Strings of exactly this
    /// length stay inline; only strictly longer ones are extracted.
    /// Default: 1000. `None` means the default.
    pub threshold: Option<usize>,
}

impl SidecarOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sidecar directory.
    pub fn sidecar_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sidecar_dir = Some(dir.into());
        self
    }

    /// Set the externalization threshold.
    pub fn threshold(mut self, chars: usize) -> Self {
        self.threshold = Some(chars);
        self
    }

    /// Resolve the effective sidecar directory for a given main file.
    fn resolve_dir(&self, main_path: &Path) -> PathBuf {
        self.sidecar_dir.clone().unwrap_or_else(|| {
            main_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        })
    }

    fn effective_threshold(&self) -> usize {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }
}

/// Compute the content hash naming a sidecar file.
///
/// First 16 hex characters of the SHA-256 of the content bytes. Truncation
/// length is part of the on-disk format.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(HASH_LEN);
    hex
}

/// Encode `value` as JSON text with large string leaves externalized.
///
/// Strings strictly longer than the threshold are written as individual
/// `<hash>.sidecar` files under the sidecar directory (created if absent)
/// and replaced by reference placeholders. `main_path` is the file the text
/// is destined for; it determines the default sidecar directory.
pub fn encode(value: &Value, main_path: &Path, options: &SidecarOptions) -> Result<String> {
    let dir = options.resolve_dir(main_path);
    fs::create_dir_all(&dir).map_err(|e| MuninnError::io(&dir, e))?;
    let shortened = externalize(value, &dir, options.effective_threshold())?;
    Ok(serde_json::to_string_pretty(&shortened)?)
}

/// Decode JSON text produced by [`encode`], resolving placeholders back to
/// their original contents.
///
/// A placeholder whose sidecar file is missing is left in place (with a
/// warning) rather than failing the whole parse. Malformed JSON is an error.
pub fn decode(text: &str, main_path: &Path, options: &SidecarOptions) -> Result<Value> {
    let dir = options.resolve_dir(main_path);
    let value: Value = serde_json::from_str(text)?;
    Ok(resolve(&value, &dir))
}

/// Encode `value` and write the result to `path`.
pub fn write_file(path: &Path, value: &Value, options: &SidecarOptions) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MuninnError::io(parent, e))?;
    }
    let text = encode(value, path, options)?;
    fs::write(path, text).map_err(|e| MuninnError::io(path, e))
}

/// Read `path` and decode it, resolving placeholders.
pub fn read_file(path: &Path, options: &SidecarOptions) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| MuninnError::io(path, e))?;
    decode(&text, path, options)
}

/// Whether any reference placeholder remains unresolved in a decoded value.
///
/// Recurses through strings, arrays, and objects. Useful after a decode to
/// detect sidecars that were lost (see the missing-sidecar failure mode).
pub fn has_unresolved_references(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains(SIDECAR_MARKER),
        Value::Array(items) => items.iter().any(has_unresolved_references),
        Value::Object(map) => map.values().any(has_unresolved_references),
        _ => false,
    }
}

/// Recursively replace long string leaves with placeholders.
fn externalize(value: &Value, dir: &Path, threshold: usize) -> Result<Value> {
    match value {
        Value::String(s) => {
            // Strictly greater-than: an exactly-threshold string stays inline.
            if s.chars().count() <= threshold {
                return Ok(value.clone());
            }
            match split_data_url(s) {
                Some((prefix, payload)) => {
                    let hash = write_sidecar(dir, payload)?;
                    Ok(Value::String(format!("{prefix}{SIDECAR_MARKER}{hash}")))
                }
                None => {
                    let hash = write_sidecar(dir, s)?;
                    Ok(Value::String(format!("{SIDECAR_MARKER}{hash}")))
                }
            }
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(externalize(item, dir, threshold)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), externalize(v, dir, threshold)?);
            }
            Ok(Value::Object(out))
        }
        _ => Ok(value.clone()),
    }
}

/// Recursively resolve placeholders back to sidecar contents.
fn resolve(value: &Value, dir: &Path) -> Value {
    match value {
        Value::String(s) => match parse_placeholder(s) {
            Some((prefix, hash)) => {
                let path = dir.join(format!("{hash}.{SIDECAR_EXT}"));
                match fs::read_to_string(&path) {
                    Ok(content) => Value::String(format!("{prefix}{content}")),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "sidecar missing, leaving reference unresolved"
                        );
                        value.clone()
                    }
                }
            }
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, dir)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, dir)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Write `content` as a sidecar file, returning its hash.
///
/// Content determines the filename, so an existing file with the same name
/// is already authoritative and the write is skipped.
fn write_sidecar(dir: &Path, content: &str) -> Result<String> {
    let hash = content_hash(content);
    let path = dir.join(format!("{hash}.{SIDECAR_EXT}"));
    if !path.exists() {
        fs::write(&path, content).map_err(|e| MuninnError::io(&path, e))?;
    }
    Ok(hash)
}

/// Split a data-URL-shaped string into `(prefix, payload)`.
///
/// The prefix includes the trailing comma (`data:<mediatype>;base64,`); the
/// media type must be non-empty and free of `;`. Returns `None` for any
/// other shape.
fn split_data_url(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("data:")?;
    let (mediatype, payload) = rest.split_once(";base64,")?;
    if mediatype.is_empty() || mediatype.contains(';') {
        return None;
    }
    let prefix_len = s.len() - payload.len();
    Some((&s[..prefix_len], payload))
}

/// Parse a full placeholder string into `(data-url prefix, hash)`.
///
/// The placeholder must occupy the entire string: an optional data-URL
/// prefix followed by the marker and a 16-hex-char hash.
fn parse_placeholder(s: &str) -> Option<(&str, &str)> {
    let (prefix, rest) = match split_data_url(s) {
        Some((prefix, payload)) => (prefix, payload),
        None => ("", s),
    };
    let hash = rest.strip_prefix(SIDECAR_MARKER)?;
    if hash.len() == HASH_LEN && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Some((prefix, hash))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_split() {
        let s = "data:application/pdf;base64,AAAA";
        let (prefix, payload) = split_data_url(s).unwrap();
        assert_eq!(prefix, "data:application/pdf;base64,");
        assert_eq!(payload, "AAAA");
    }

    #[test]
    fn data_url_split_rejects_plain_strings() {
        assert!(split_data_url("hello world").is_none());
        assert!(split_data_url("data:text/plain,not-base64").is_none());
        // Empty media type
        assert!(split_data_url("data:;base64,AAAA").is_none());
    }

    #[test]
    fn placeholder_parse_plain() {
        let s = format!("{SIDECAR_MARKER}{}", "a".repeat(HASH_LEN));
        let (prefix, hash) = parse_placeholder(&s).unwrap();
        assert_eq!(prefix, "");
        assert_eq!(hash, "a".repeat(HASH_LEN));
    }

    #[test]
    fn placeholder_parse_with_data_url_prefix() {
        let s = format!("data:image/png;base64,{SIDECAR_MARKER}{}", "0".repeat(HASH_LEN));
        let (prefix, hash) = parse_placeholder(&s).unwrap();
        assert_eq!(prefix, "data:image/png;base64,");
        assert_eq!(hash, "0".repeat(HASH_LEN));
    }

    #[test]
    fn placeholder_parse_rejects_bad_hashes() {
        // Wrong length
        assert!(parse_placeholder(&format!("{SIDECAR_MARKER}abc")).is_none());
        // Uppercase hex is not produced by the encoder
        assert!(parse_placeholder(&format!("{SIDECAR_MARKER}{}", "A".repeat(HASH_LEN))).is_none());
        // Ordinary strings
        assert!(parse_placeholder("just text").is_none());
    }

    #[test]
    fn content_hash_is_stable_and_truncated() {
        let h1 = content_hash("payload");
        let h2 = content_hash("payload");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), HASH_LEN);
        assert_ne!(content_hash("payload"), content_hash("other"));
    }

    #[test]
    fn unresolved_reference_scan() {
        let clean = serde_json::json!({"a": ["b", {"c": 1}], "d": null});
        assert!(!has_unresolved_references(&clean));

        let dirty = serde_json::json!({
            "a": [format!("{SIDECAR_MARKER}{}", "0".repeat(HASH_LEN))]
        });
        assert!(has_unresolved_references(&dirty));
    }
}
