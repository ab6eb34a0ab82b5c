//! JSON salvage for LLM output
//!
//! Chat models wrap structured answers in prose, code fences, and markers
//! like `[JSON]`. These scanners find the first complete JSON value of the
//! wanted shape, honoring string escapes and nesting, and ignore everything
//! around it.

use serde_json::Value;

/// Find and parse the first complete JSON array in `text`.
///
/// Returns `None` when no parseable array exists. Candidates that fail to
/// parse are skipped and scanning continues at the next opening bracket.
#[must_use]
pub fn first_json_array(text: &str) -> Option<Vec<Value>> {
    first_json_value(text, '[', ']').and_then(|value| match value {
        Value::Array(items) => Some(items),
        _ => None,
    })
}

/// Find and parse the first complete JSON object in `text`.
#[must_use]
pub fn first_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    first_json_value(text, '{', '}').and_then(|value| match value {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

fn first_json_value(text: &str, open: char, close: char) -> Option<Value> {
    let bytes: Vec<char> = text.chars().collect();
    let mut start = 0;

    while start < bytes.len() {
        if bytes[start] != open {
            start += 1;
            continue;
        }

        if let Some(end) = matching_close(&bytes, start, open, close) {
            let candidate: String = bytes[start..=end].iter().collect();
            if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                return Some(value);
            }
        }
        start += 1;
    }
    None
}

/// Scan from `start` (an `open` char) to its matching `close`, tracking
/// nesting depth, string state, and backslash escapes.
fn matching_close(chars: &[char], start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}
