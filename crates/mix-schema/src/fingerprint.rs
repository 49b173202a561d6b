//! Deterministic fingerprints of configuration payloads.
//!
//! Raw payloads are recorded as a blake3 content digest; structured payloads as
//! a canonical JSON rendering with object keys sorted at every depth. Two
//! payloads fingerprint equally exactly when their recorded form is equal.

use crate::lock::{LockConfigEntry, LockEntry};
use crate::manifest::{ConfigData, ConfigEntry, Package};
use serde_json::Value;
use std::fmt::Write as _;

const DIGEST_HEX_LEN: usize = 64;

/// Blake3 digest of the UTF-8 bytes of `payload`, lowercase hex.
pub fn content_digest(payload: &str) -> String {
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}

/// True if `s` has the shape of a [`content_digest`] output.
pub fn is_content_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Compact JSON with lexicographically sorted object keys.
///
/// Does not depend on the iteration order of `serde_json::Map`, so the output
/// is stable whether or not `preserve_order` is enabled anywhere in the build.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(&Value::String(key.clone()), out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar(value: &Value, out: &mut String) {
    // Scalars have a single serde_json rendering; Display cannot fail for them.
    let _ = write!(out, "{value}");
}

impl LockConfigEntry {
    /// Fingerprint a manifest config entry into its lock-side record.
    pub fn record(entry: &ConfigEntry) -> Self {
        let data = match &entry.data {
            ConfigData::Raw(payload) => content_digest(payload),
            ConfigData::Structured(value) => canonical_json(value),
        };
        Self {
            kind: entry.kind(),
            path: entry.path.clone(),
            data,
        }
    }
}

impl LockEntry {
    /// Build the lock entry recorded after `pkg` has been applied.
    pub fn record(pkg: &Package) -> Self {
        Self {
            id: pkg.id.clone(),
            version: pkg.version.clone(),
            config: pkg.config.iter().map(LockConfigEntry::record).collect(),
        }
    }
}
