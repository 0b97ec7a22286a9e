use serde_json::{Map, Value};

/// Derive a stable cache key from a loosely-typed parameter mapping.
///
/// Object keys are sorted at every depth before hashing, so two mappings that
/// only differ in insertion order produce the same key.
pub fn cache_key_for_params(params: &Map<String, Value>) -> String {
    let canonical = canonicalize(&Value::Object(params.clone()));
    let raw = canonical.to_string();
    blake3::hash(raw.as_bytes()).to_hex().to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
