/*!
 * Recovery of translated items from free-form model replies.
 *
 * The reply is expected to be the numbered list requested by
 * `PromptBuilder`, but models wrap it in commentary, renumber it, drop the
 * quoting or answer with a JSON array instead. `parse_response` accepts all
 * of these and never fails: a reply it cannot map onto the request simply
 * yields a sequence whose length differs from the expected count, empty when
 * nothing recognizable was found.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `1. x`, `1) x`, `1: x`, `[1] x`, `(1) x`, and `1."x"`
static INDEXED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:\[(\d{1,4})\]|\((\d{1,4})\)|(\d{1,4})[.):])(\s.*|["“「].*)?$"#)
        .expect("indexed line pattern is valid")
});

/// Quote pairs stripped from around an unescaped item
const QUOTE_PAIRS: [(char, char); 5] = [
    ('"', '"'),
    ('“', '”'),
    ('「', '」'),
    ('『', '』'),
    ('«', '»'),
];

/// Keys tried, in order, when projecting a structured reply to its text
const TEXT_FIELDS: [&str; 7] = [
    "data",
    "choices",
    "message",
    "content",
    "text",
    "generated_text",
    "output",
];

/// Recover the translated items from `raw`, in request order.
///
/// The result has `expected_count` items when the reply honours the
/// contract; any other length means the batch failed.
pub fn parse_response(raw: &str, expected_count: usize) -> Vec<String> {
    let lines: Vec<&str> = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();

    let indexed = collect_indexed(&lines);
    if !indexed.is_empty() {
        return order_items(indexed);
    }

    // Unnumbered prose is not a translation
    parse_json_array(raw).unwrap_or_else(|| {
        debug!("No numbered items or JSON array for a batch of {}", expected_count);
        Vec::new()
    })
}

/// Project a structured reply to its primary text.
///
/// Strings pass through; arrays yield their first element; objects yield
/// the first known text field. Anything else, or a payload with no text,
/// is rendered as JSON so a diagnostic can still show it.
pub fn project_reply(value: &Value) -> String {
    primary_text(value).unwrap_or_else(|| value.to_string())
}

fn primary_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.first().and_then(primary_text),
        Value::Object(map) => TEXT_FIELDS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(primary_text),
        _ => None,
    }
}

/// An indexed item being collected, with its continuation lines
struct PendingItem {
    index: usize,
    text: String,
}

fn collect_indexed(lines: &[&str]) -> Vec<(usize, String)> {
    let mut items = Vec::new();
    let mut current: Option<PendingItem> = None;
    let mut blank_since_item = false;

    for line in lines {
        if line.trim().is_empty() {
            blank_since_item = true;
            continue;
        }

        if let Some(caps) = INDEXED_LINE.captures(line) {
            let index = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .and_then(|m| m.as_str().parse::<usize>().ok());
            if let Some(index) = index {
                if let Some(done) = current.take() {
                    items.push((done.index, clean_item(&done.text)));
                }
                let rest = caps.get(4).map_or("", |m| m.as_str());
                current = Some(PendingItem {
                    index,
                    text: rest.trim().to_string(),
                });
                blank_since_item = false;
                continue;
            }
        }

        // Unnumbered text directly under an unquoted item continues it;
        // anything else is commentary
        if let Some(item) = current.as_mut() {
            if !blank_since_item && decode_json_string(&item.text).is_none() {
                item.text.push('\n');
                item.text.push_str(line.trim());
            }
        }
    }

    if let Some(done) = current {
        items.push((done.index, clean_item(&done.text)));
    }
    items
}

/// Order items by their recovered index when the indices are a permutation
/// of `1..=k` (or `0..k`); otherwise keep them as they appeared.
fn order_items(mut items: Vec<(usize, String)>) -> Vec<String> {
    let count = items.len();
    let base = items.iter().map(|(i, _)| *i).min().unwrap_or(1);

    if base <= 1 {
        let mut seen = vec![false; count];
        let is_permutation = items.iter().all(|(index, _)| {
            let slot = index - base;
            slot < count && !std::mem::replace(&mut seen[slot], true)
        });
        if is_permutation {
            items.sort_by_key(|(index, _)| *index);
        }
    }

    items.into_iter().map(|(_, text)| text).collect()
}

/// A reply that is (or contains) a JSON array of strings
fn parse_json_array(raw: &str) -> Option<Vec<String>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Vec<String>>(&raw[start..=end]).ok()
}

fn clean_item(text: &str) -> String {
    let text = text.trim();

    if let Some(decoded) = decode_json_string(text) {
        return decoded;
    }

    if text.starts_with('[') && text.ends_with(']') {
        if let Ok(mut wrapped) = serde_json::from_str::<Vec<String>>(text) {
            if wrapped.len() == 1 {
                return wrapped.remove(0);
            }
        }
    }

    strip_quotes(text).trim().to_string()
}

fn decode_json_string(text: &str) -> Option<String> {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        serde_json::from_str::<String>(text).ok()
    } else {
        None
    }
}

fn strip_quotes(text: &str) -> &str {
    for (open, close) in QUOTE_PAIRS {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner;
        }
    }
    text
}
