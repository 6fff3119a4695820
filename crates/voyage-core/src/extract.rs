//! Locating a JSON object inside free-form model output.
//!
//! Models asked for "pure JSON" still wrap it in code fences or surround it
//! with commentary. [`extract_json`] finds the most likely complete object
//! substring; [`parse_json_document`] runs the full candidate sequence the
//! relay uses (raw text first, then the extracted candidate).

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```json\s*(.*?)```").expect("fenced JSON pattern is valid")
});

/// Return the most likely complete JSON object substring of `text`.
///
/// Tried in order:
/// 1. The interior of the first fenced block tagged `json`, trimmed and
///    returned without further checks.
/// 2. The span from the first `{` to the last `}`, accepted only when its
///    braces balance. Braces inside string literals are not counted.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(inner) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return Some(inner.as_str().trim());
    }

    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if first >= last {
        return None;
    }
    let candidate = &text[first..=last];
    is_balanced(candidate).then_some(candidate)
}

/// Strict-parse `text`, falling back to its extraction candidate.
///
/// Each candidate is parsed once; the first success wins.
pub fn parse_json_document(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let candidate = extract_json(text)?;
    serde_json::from_str(candidate).ok()
}

/// Depth scan over `{`/`}` that never goes negative and ends at zero.
fn is_balanced(candidate: &str) -> bool {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in candidate.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }

    depth == 0 && !in_string
}
