//! On-disk cache entry records.
//!
//! One cache entry is a folder holding three files: `meta.json` (a
//! [`CacheMeta`], plain JSON, cheap to inspect), `request.json` (the request
//! body as sent), and `response.json` (a [`ResponseSnapshot`]). The latter
//! two are written through the sidecar codec so large payloads never bloat
//! the entry folder. Field names are fixed camelCase — they are the on-disk
//! format, shared with the tooling that reads cache folders by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of provenance frames recorded per entry.
pub const MAX_STACK_FRAMES: usize = 5;

/// Maximum length of the human-readable response summary, in characters.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Inspectable metadata for one cache entry.
///
/// Must never contain a field whose value could be large — raw payloads
/// belong in the sidecar-encoded snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    /// The derived cache key (also the folder name).
    pub key: String,
    /// Destination URL of the request.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// `model` field of the request body, when present as a string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// `provider` field of the request body, copied verbatim when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    /// HTTP status code of the captured response.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Capture time, epoch milliseconds.
    pub timestamp: u64,
    /// Capture time, ISO-8601.
    #[serde(rename = "timestampISO")]
    pub timestamp_iso: String,
    /// Bounded preview of the response body.
    pub response_summary: String,
    /// Whether the status was in the 2xx range.
    pub success: bool,
    /// `error.message` of an error-shaped JSON response body, when present
    /// and the request was not successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Caller frames captured at store time, `file:line`, at most
    /// [`MAX_STACK_FRAMES`].
    pub stack_trace: Vec<String>,
    /// First caller frame's file, for quick grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_file: Option<String>,
}

/// Captured response: status line, headers, body, capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Response headers as a flat name → value map.
    pub headers: std::collections::BTreeMap<String, String>,
    /// Body, parsed JSON or raw text — exactly one of the two.
    #[serde(flatten)]
    pub body: ResponseBody,
    /// Capture time, epoch milliseconds.
    pub timestamp: u64,
}

/// Response body representation — parsed JSON and raw text are mutually
/// exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// Body that parsed as JSON, stored structurally.
    #[serde(rename = "bodyJson")]
    Json(Value),
    /// Body that did not parse as JSON, stored as-is.
    #[serde(rename = "bodyText")]
    Text(String),
}

impl ResponseBody {
    /// Serialize the body back to the byte form delivered to callers.
    pub fn to_text(&self) -> String {
        match self {
            ResponseBody::Json(value) => {
                serde_json::to_string(value).expect("JSON value serialization cannot fail")
            }
            ResponseBody::Text(text) => text.clone(),
        }
    }

    /// The parsed JSON body, if this is the JSON variant.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }
}

/// A cache entry as returned by lookup: metadata plus response snapshot.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub meta: CacheMeta,
    pub response: ResponseSnapshot,
}

impl CachedEntry {
    /// Entry age relative to `now_ms`, saturating at zero for clock skew.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.meta.timestamp)
    }
}

/// One provenance frame: the file and line of a logical call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: u32,
}

impl Frame {
    fn render(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Explicit provenance token recorded with each stored entry.
///
/// Call sites pass this in rather than the store inferring it from a
/// runtime stack: [`Provenance::capture()`] records the immediate caller
/// via `#[track_caller]`, which by construction excludes cache-internal
/// frames. Frame count is bounded at construction.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    frames: Vec<Frame>,
}

impl Provenance {
    /// Capture the immediate caller's file and line.
    #[track_caller]
    pub fn capture() -> Self {
        let location = std::panic::Location::caller();
        Self {
            frames: vec![Frame {
                file: location.file().to_string(),
                line: location.line(),
            }],
        }
    }

    /// Build from caller-supplied frames, keeping at most
    /// [`MAX_STACK_FRAMES`].
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().take(MAX_STACK_FRAMES).collect(),
        }
    }

    /// An empty token (no call-site information).
    pub fn none() -> Self {
        Self::default()
    }

    /// Rendered `file:line` frames for `meta.json`.
    pub fn stack_trace(&self) -> Vec<String> {
        self.frames.iter().map(Frame::render).collect()
    }

    /// File of the first frame, if any.
    pub fn caller_file(&self) -> Option<String> {
        self.frames.first().map(|f| f.file.clone())
    }
}
