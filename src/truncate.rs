//! Log-safe truncation of large values.
//!
//! Request and response structures in this domain routinely embed megabytes
//! of base64. [`truncate_strings`] shortens every long string leaf so a
//! whole structure can be printed to a console without flooding it. Purely
//! cosmetic — never used on data that is stored or replayed.

use serde_json::Value;

/// Recursively shorten string leaves longer than `max_len` characters.
///
/// Shortened strings are annotated with their original length, e.g.
/// `"JVBERi0xLjQKJ… [truncated, 482193 chars total]"`. Arrays and objects
/// are processed recursively; every other value kind passes through
/// unchanged.
pub fn truncate_strings(value: &Value, max_len: usize) -> Value {
    match value {
        Value::String(s) => {
            let total = s.chars().count();
            if total <= max_len {
                return value.clone();
            }
            let head: String = s.chars().take(max_len).collect();
            Value::String(format!("{head}… [truncated, {total} chars total]"))
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| truncate_strings(v, max_len)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_strings(v, max_len)))
                .collect(),
        ),
        _ => value.clone(),
    }
}
