//! Tolerant parsing of LLM output into the content schema.
//!
//! Model output is untrusted: it may wrap the JSON in prose or markdown
//! fences, emit several objects, stop half way, or refuse outright.
//! [`normalize`] is total over `&str` and always returns every field, with
//! `activities` and `key_points` non-empty.
//!
//! Extraction walks each `{` in the text and runs serde_json's streaming
//! deserializer from there, which stops at the end of the first complete
//! value and ignores whatever follows. Braces inside prose simply fail to
//! parse and the scan moves on.

use serde_json::{Map, Value};
use tracing::debug;

/// Maximum characters of raw text kept as a degraded paraphrase.
pub const PARAPHRASE_PREFIX_CHARS: usize = 200;

/// Upper bound on `{` positions tried before giving up.
const MAX_CANDIDATES: usize = 64;

const SCHEMA_KEYS: [&str; 6] = [
    "paraphrase",
    "story",
    "prayer",
    "activities",
    "keyPoints",
    "key_points",
];

// Per-field back-fill when a parsed object is missing a field.
pub const DEFAULT_PARAPHRASE: &str = "Content could not be generated.";
pub const DEFAULT_STORY: &str = "Story could not be generated.";
pub const DEFAULT_PRAYER: &str = "Prayer could not be generated.";
pub const DEFAULT_ACTIVITY: &str = "Activity could not be generated.";
pub const DEFAULT_KEY_POINT: &str = "Key point could not be generated.";

// Degraded content when no JSON object could be recovered at all.
pub const DEGRADED_STORY: &str =
    "The AI generated a response but it couldn't be properly formatted. Please try again.";
pub const DEGRADED_PRAYER: &str = "Dear God, help us understand this verse better. Amen.";
pub const DEGRADED_ACTIVITIES: [&str; 3] = [
    "Read the verse together",
    "Talk about what it means",
    "Draw a picture about it",
];
pub const DEGRADED_KEY_POINTS: [&str; 3] = [
    "God loves us",
    "We should love others",
    "Faith is important",
];

/// Schema fields recovered from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields {
    pub paraphrase: String,
    pub story: String,
    pub prayer: String,
    pub activities: Vec<String>,
    pub key_points: Vec<String>,
    /// `false` when no JSON object was found and defaults were synthesized.
    pub parsed: bool,
}

/// Normalize raw model text into schema fields. Never fails.
pub fn normalize(raw: &str) -> NormalizedFields {
    match extract_object(raw) {
        Some(object) => from_object(&object),
        None => {
            debug!(len = raw.len(), "No JSON object in model output, degrading");
            degraded(raw)
        }
    }
}

/// Find the first JSON object embedded in `raw`.
///
/// Prefers the first object that carries at least one schema key; falls back
/// to the first object of any shape.
pub fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let mut first_any: Option<Map<String, Value>> = None;

    for (idx, _) in raw.match_indices('{').take(MAX_CANDIDATES) {
        let mut stream = serde_json::Deserializer::from_str(&raw[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            if SCHEMA_KEYS.iter().any(|k| map.contains_key(*k)) {
                return Some(map);
            }
            if first_any.is_none() {
                first_any = Some(map);
            }
        }
    }

    first_any
}

fn from_object(object: &Map<String, Value>) -> NormalizedFields {
    NormalizedFields {
        paraphrase: text_field(object, "paraphrase", DEFAULT_PARAPHRASE),
        story: text_field(object, "story", DEFAULT_STORY),
        prayer: text_field(object, "prayer", DEFAULT_PRAYER),
        activities: list_field(object.get("activities"), DEFAULT_ACTIVITY),
        key_points: list_field(
            object.get("keyPoints").or_else(|| object.get("key_points")),
            DEFAULT_KEY_POINT,
        ),
        parsed: true,
    }
}

fn degraded(raw: &str) -> NormalizedFields {
    let text = raw.trim();
    let paraphrase = if text.is_empty() {
        DEFAULT_PARAPHRASE.to_string()
    } else {
        truncate_chars(text, PARAPHRASE_PREFIX_CHARS)
    };

    NormalizedFields {
        paraphrase,
        story: DEGRADED_STORY.to_string(),
        prayer: DEGRADED_PRAYER.to_string(),
        activities: DEGRADED_ACTIVITIES.iter().map(|s| s.to_string()).collect(),
        key_points: DEGRADED_KEY_POINTS.iter().map(|s| s.to_string()).collect(),
        parsed: false,
    }
}

fn text_field(object: &Map<String, Value>, key: &str, default: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| default.to_string())
}

/// Coerce a value into a non-empty list of strings.
///
/// Non-arrays are replaced wholesale. Inside an array, strings are kept,
/// numbers and booleans are stringified, everything else is dropped.
fn list_field(value: Option<&Value>, default: &str) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    if items.is_empty() {
        vec![default.to_string()]
    } else {
        items
    }
}

/// Keep at most `max_chars` characters, appending `...` only when cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
