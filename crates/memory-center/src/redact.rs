use serde_json::{Map, Value};
use url::Url;

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &["password", "token", "secret", "key", "auth", "credential"];

pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|needle| lowered.contains(needle))
}

/// Replace values under sensitive keys, recursing into objects and arrays.
pub fn redact_params(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact_params(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_params).collect()),
        other => other.clone(),
    }
}

/// Origin and path only; query strings and fragments are dropped.
pub fn redact_url(raw: &str) -> String {
    if let Ok(parsed) = Url::parse(raw) {
        if parsed.cannot_be_a_base() {
            return format!("{}:{}", parsed.scheme(), parsed.path());
        }
        let mut redacted = format!("{}://", parsed.scheme());
        if let Some(host) = parsed.host_str() {
            redacted.push_str(host);
        }
        if let Some(port) = parsed.port() {
            redacted.push_str(&format!(":{port}"));
        }
        redacted.push_str(parsed.path());
        redacted
    } else {
        let end = raw.find(|c| c == '?' || c == '#').unwrap_or(raw.len());
        raw[..end].to_string()
    }
}
