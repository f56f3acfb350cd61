//! Tests for the sidecar codec — externalization, round-trips, resilience.

use std::fs;
use std::path::Path;

use serde_json::json;

use muninn::sidecar::{
    self, DEFAULT_THRESHOLD, SIDECAR_MARKER, SidecarOptions, has_unresolved_references,
};

fn opts(dir: &Path, threshold: usize) -> SidecarOptions {
    SidecarOptions::new().sidecar_dir(dir).threshold(threshold)
}

fn sidecar_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "sidecar"))
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn round_trip_without_large_strings_creates_no_sidecars() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let options = opts(dir.path(), 100);

    let value = json!({
        "model": "test",
        "messages": [{"role": "user", "content": "short"}],
        "count": 3,
        "flag": null
    });

    let text = sidecar::encode(&value, &main, &options).unwrap();
    assert!(!text.contains(SIDECAR_MARKER));
    assert_eq!(sidecar_count(dir.path()), 0);

    let decoded = sidecar::decode(&text, &main, &options).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn round_trip_with_large_strings() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let options = opts(dir.path(), 50);

    let long = "a".repeat(500);
    let value = json!({
        "small": "inline",
        "big": long.clone(),
        "nested": {"also_big": "b".repeat(200)}
    });

    let text = sidecar::encode(&value, &main, &options).unwrap();
    assert!(text.contains(SIDECAR_MARKER));
    assert!(!text.contains(&long), "payload must not remain inline");
    assert_eq!(sidecar_count(dir.path()), 2);

    let decoded = sidecar::decode(&text, &main, &options).unwrap();
    assert_eq!(decoded, value);
    assert!(!has_unresolved_references(&decoded));
}

#[test]
fn repeated_long_string_stored_once() {
    let dir = tempfile::tempdir().unwrap();
    let options = opts(dir.path(), 10);
    let shared = "repeated-payload-".repeat(10);

    let a = json!({"x": shared.clone(), "y": [shared.clone()]});
    let b = json!({"entirely": {"different": {"shape": shared.clone()}}});

    sidecar::encode(&a, &dir.path().join("a.json"), &options).unwrap();
    sidecar::encode(&b, &dir.path().join("b.json"), &options).unwrap();

    assert_eq!(sidecar_count(dir.path()), 1, "identical contents must dedupe");
}

#[test]
fn data_url_keeps_prefix_inline() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let options = opts(dir.path(), 100);

    let payload = "J".repeat(5000);
    let value = json!({"document": format!("data:application/pdf;base64,{payload}")});

    let text = sidecar::encode(&value, &main, &options).unwrap();
    let encoded: serde_json::Value = serde_json::from_str(&text).unwrap();
    let placeholder = encoded["document"].as_str().unwrap();
    assert!(
        placeholder.starts_with("data:application/pdf;base64,"),
        "media-type prefix must stay visible: {placeholder}"
    );
    assert!(placeholder.contains(SIDECAR_MARKER));

    // Only the payload is in the sidecar file, byte for byte
    let decoded = sidecar::decode(&text, &main, &options).unwrap();
    assert_eq!(
        decoded["document"].as_str().unwrap(),
        format!("data:application/pdf;base64,{payload}")
    );
}

#[test]
fn threshold_is_strictly_greater_than() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let threshold = 32;
    let options = opts(dir.path(), threshold);

    let at = json!({"s": "x".repeat(threshold)});
    let text = sidecar::encode(&at, &main, &options).unwrap();
    assert!(!text.contains(SIDECAR_MARKER));
    assert_eq!(sidecar_count(dir.path()), 0);

    let over = json!({"s": "x".repeat(threshold + 1)});
    let text = sidecar::encode(&over, &main, &options).unwrap();
    assert!(text.contains(SIDECAR_MARKER));
    assert_eq!(sidecar_count(dir.path()), 1);
}

#[test]
fn missing_sidecar_degrades_to_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let options = opts(dir.path(), 10);

    let value = json!({"payload": "c".repeat(100), "other": "kept"});
    let text = sidecar::encode(&value, &main, &options).unwrap();

    // Simulate external loss of the sidecar file
    for entry in fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "sidecar") {
            fs::remove_file(path).unwrap();
        }
    }

    let decoded = sidecar::decode(&text, &main, &options).expect("decode must not fail");
    let leftover = decoded["payload"].as_str().unwrap();
    assert!(leftover.starts_with(SIDECAR_MARKER));
    assert_eq!(decoded["other"], "kept");
    assert!(has_unresolved_references(&decoded));
}

#[test]
fn write_and_read_file_compose_the_codec() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deep").join("snapshot.json");
    let options = SidecarOptions::new().threshold(20);

    let value = json!({"blob": "d".repeat(100), "n": 1});
    sidecar::write_file(&path, &value, &options).unwrap();

    // Default sidecar dir is the main file's directory
    assert_eq!(sidecar_count(path.parent().unwrap()), 1);

    let read_back = sidecar::read_file(&path, &options).unwrap();
    assert_eq!(read_back, value);
}

#[test]
fn default_threshold_is_one_thousand() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let options = SidecarOptions::new().sidecar_dir(dir.path());

    let value = json!({"s": "e".repeat(DEFAULT_THRESHOLD)});
    sidecar::encode(&value, &main, &options).unwrap();
    assert_eq!(sidecar_count(dir.path()), 0);

    let value = json!({"s": "e".repeat(DEFAULT_THRESHOLD + 1)});
    sidecar::encode(&value, &main, &options).unwrap();
    assert_eq!(sidecar_count(dir.path()), 1);
}

#[test]
fn unicode_strings_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let options = opts(dir.path(), 5);

    let value = json!({"text": "åäö€→🦀".repeat(10)});
    let text = sidecar::encode(&value, &main, &options).unwrap();
    let decoded = sidecar::decode(&text, &main, &options).unwrap();
    assert_eq!(decoded, value);
}
