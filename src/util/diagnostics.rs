use crate::BodySnippetConfig;
use http::HeaderMap;

use super::redact::{redact_text, truncate_utf8};

pub(crate) fn request_id(headers: &HeaderMap) -> Option<Box<str>> {
    for name in [
        "x-request-id",
        "x-correlation-id",
        "x-amzn-requestid",
        "x-amz-request-id",
    ] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string().into_boxed_str());
            }
        }
    }
    None
}

/// Pull a human-readable message out of an error body.
///
/// Mautic reports API errors as `{"errors": [{"message": "...", "code": 400}]}`;
/// the OAuth endpoints use `{"error": {"message": "..."}}` or a flat string.
pub(crate) fn extract_message(body: &[u8]) -> Option<Box<str>> {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return None;
    };

    let nested = value
        .get("errors")
        .and_then(|v| v.as_array())
        .and_then(|errors| errors.first())
        .or_else(|| value.get("error").filter(|v| v.is_object()));

    let candidates = ["message", "error_description", "error", "Message", "Error"];
    for source in nested.into_iter().chain([&value]) {
        for key in candidates {
            if let Some(msg) = source.get(key).and_then(|v| v.as_str()) {
                let msg = msg.trim();
                if !msg.is_empty() {
                    return Some(msg.to_string().into_boxed_str());
                }
            }
        }
    }
    None
}

pub(crate) fn body_snippet(
    body: &[u8],
    config: BodySnippetConfig,
    secrets: &[&str],
) -> Option<Box<str>> {
    if !config.enabled {
        return None;
    }

    let body = redact_text(String::from_utf8_lossy(body).into_owned(), secrets);
    Some(truncate_utf8(&body, config.max_bytes).into())
}
