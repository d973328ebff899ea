//! Canonical JSON form, structural equality and content fingerprints.
//!
//! Object keys are written in sorted order regardless of how the value was
//! built, so two documents that differ only in key order produce the same
//! bytes, compare equal and share a fingerprint. Array order is significant;
//! callers that treat a list as a set sort it before canonicalising.
//! Numbers compare by value, so `99` and `99.0` are the same content.

use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::store::DocKind;

/// Serialize `value` with object keys sorted at every level.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::String(s) => write_string(s, out),
        Value::Number(n) => write_number(n, out),
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

/// Largest magnitude below which every integral f64 is exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn write_number(n: &Number, out: &mut Vec<u8>) {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER => {
            out.extend_from_slice((f as i64).to_string().as_bytes())
        }
        _ => out.extend_from_slice(n.to_string().as_bytes()),
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    // Value::String's Display is the JSON-escaped literal.
    out.extend_from_slice(Value::String(s.to_owned()).to_string().as_bytes());
}

/// Deep equality that ignores object key order.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    canonical_bytes(a) == canonical_bytes(b)
}

/// SHA-256 fingerprint of `value` within the `kind` collection, as lowercase hex.
///
/// The collection name is mixed in so that identical bodies stored in two
/// collections never share a key.
pub fn fingerprint(kind: DocKind, value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_bytes(value));
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
