//! Stable request fingerprints.
//!
//! A fingerprint is the lowercase hex SHA-256 of `query ":" canonical(variables)`.
//! Canonical JSON sorts object keys bytewise at every level and carries no
//! whitespace, so it does not depend on the map type `serde_json` was built
//! with or on the order callers inserted keys.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Query parameter carrying the fingerprint.
pub const HASH_PARAM: &str = "hash";

const SEPARATOR: &str = ":";

/// Derive the fingerprint for a query and its variables.
pub fn fingerprint(query: &str, variables: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(canonical_json(variables).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Serialize a JSON value with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        Value::String(s) => write_string(s, out),
        other => out.push_str(&other.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    // Serializing a str cannot fail.
    out.push_str(&serde_json::to_string(s).unwrap_or_default());
}

/// Rewrite `url` to `<path>?hash=<fingerprint>`.
///
/// A non-empty `hash` already present in the query string wins over the
/// computed value and is kept verbatim. Other query parameters are dropped.
/// Returns the new URL and the fingerprint used.
pub fn annotate_url(url: &str, query: &str, variables: &Value) -> (String, String) {
    let (path, search) = url.split_once('?').unwrap_or((url, ""));

    let hash = url::form_urlencoded::parse(search.as_bytes())
        .find(|(key, value)| key == HASH_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| fingerprint(query, variables));

    (with_hash(path, &hash), hash)
}

/// Replace the query string of `url` with `hash=<hash>`.
pub fn with_hash(url: &str, hash: &str) -> String {
    let path = url.split_once('?').map_or(url, |(path, _)| path);
    let encoded =
        url::form_urlencoded::Serializer::new(String::new()).append_pair(HASH_PARAM, hash).finish();
    format!("{}?{}", path, encoded)
}
