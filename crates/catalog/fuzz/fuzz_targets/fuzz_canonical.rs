//! Fuzz target for the canonical JSON writer.
//!
//! This fuzzer tests that canonical bytes:
//! 1. Are always valid JSON
//! 2. Do not depend on object key order

#![no_main]

use libfuzzer_sys::fuzz_target;
use catalog::canonical::{canonical_bytes, structurally_equal};
use serde_json::Value;

fn reverse_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut reversed = serde_json::Map::new();
            for (k, v) in map.iter().rev() {
                reversed.insert(k.clone(), reverse_keys(v));
            }
            Value::Object(reversed)
        }
        Value::Array(items) => Value::Array(items.iter().map(reverse_keys).collect()),
        other => other.clone(),
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let bytes = canonical_bytes(&value);
    assert!(serde_json::from_slice::<Value>(&bytes).is_ok());
    assert!(structurally_equal(&value, &reverse_keys(&value)));
});
