//! Best-effort text extraction from analysis backend responses.
//!
//! Backend versions nest the answer differently, so extraction walks a fixed
//! list of known shapes and degrades to the raw body instead of failing.

use serde_json::Value;

/// Pull the human-readable analysis text out of a JSON response body.
///
/// Returns `body` unchanged when it is not JSON or matches no known shape.
pub fn extract_text(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    find_text(&json)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Text from a proxy response: the `text` field when present, otherwise [`extract_text`].
pub fn extract_proxy_text(body: &str) -> String {
    let text = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("text").and_then(Value::as_str).map(str::to_string))
        .filter(|t| !t.trim().is_empty());
    text.unwrap_or_else(|| extract_text(body))
}

fn find_text(json: &Value) -> Option<&str> {
    let object = json.as_object()?;

    if let Some(candidate) = object
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
    {
        let from_candidate = candidate
            .pointer("/content/parts/0/text")
            .and_then(Value::as_str)
            .or_else(|| candidate.pointer("/content/text").and_then(Value::as_str))
            .or_else(|| candidate.get("output").and_then(Value::as_str))
            .or_else(|| candidate.get("text").and_then(Value::as_str));
        if from_candidate.is_some() {
            return from_candidate;
        }
    }

    if let Some(text) = object.get("output").and_then(Value::as_str) {
        return Some(text);
    }
    if let Some(text) = object.get("candidatesText").and_then(Value::as_str) {
        return Some(text);
    }

    object.values().find_map(Value::as_str)
}
