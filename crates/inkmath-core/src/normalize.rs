//! Response normalization for noisy LLM output.
//!
//! The Completion capability promises JSON but routinely wraps it in
//! markdown fences, prepends prose, or emits bodies with broken escaping.
//! `normalize` recovers a well-formed object through tiered repair: fence
//! stripping, brace slicing, character-level fixes, strict parse, and a
//! last-resort field salvage keyed on the known response fields.
//!
//! Everything here is a pure transform; nothing returns an error.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Leading marker for affirming feedback.
pub const AFFIRM_MARKER: &str = "✅";
/// Leading marker for warning feedback.
pub const WARN_MARKER: &str = "⚠️";
/// Leading marker for neutral notes.
pub const NOTE_MARKER: &str = "📝";
/// Leading marker for hints.
pub const HINT_MARKER: &str = "💡";

/// Recover a JSON object from raw completion text.
///
/// Returns `None` when no JSON-like structure can be found at all. The
/// salvage tier is a best-effort patch for one provider's observed failure
/// modes, not a general malformed-JSON parser; callers should treat a
/// salvaged object the same as a parsed one but expect missing fields.
pub fn normalize(raw: &str) -> Option<Value> {
    let defenced = strip_fences(raw.trim());
    let start = defenced.find('{')?;
    let end = defenced.rfind('}')?;
    if end <= start {
        return None;
    }
    let body = repair(&defenced[start..=end]);

    match serde_json::from_str::<Value>(&body) {
        Ok(value) if value.is_object() => Some(value),
        _ => salvage_fields(&body),
    }
}

/// Drop markdown fence lines (``` or ```json) wherever they appear.
fn strip_fences(text: &str) -> String {
    if !text.contains("```") {
        return text.to_string();
    }
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixed set of character-level repairs observed to make bodies parseable:
/// doubled quote-escapes collapsed, raw control characters flattened to
/// spaces (legal between tokens, and rescues them inside string values).
fn repair(body: &str) -> String {
    body.replace("\\\\\"", "\\\"")
        .replace(['\r', '\n', '\t'], " ")
}

struct SalvagePatterns {
    feedback: Regex,
    explanation: Regex,
    score: Regex,
    confidence: Regex,
    is_correct: Regex,
    suggestions: Regex,
    string_item: Regex,
}

fn salvage_patterns() -> &'static SalvagePatterns {
    static PATTERNS: OnceLock<SalvagePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SalvagePatterns {
        feedback: Regex::new(r#""feedback"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap(),
        explanation: Regex::new(r#""explanation"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap(),
        score: Regex::new(r#""score"\s*:\s*"?(-?\d+(?:\.\d+)?)"?"#).unwrap(),
        confidence: Regex::new(r#""confidence"\s*:\s*"?(-?\d+(?:\.\d+)?)"?"#).unwrap(),
        is_correct: Regex::new(r#""isCorrect"\s*:\s*"?(true|false)"?"#).unwrap(),
        suggestions: Regex::new(r#""suggestions"\s*:\s*\[([^\]]*)\]"#).unwrap(),
        string_item: Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap(),
    })
}

/// Degraded extraction: pull out whatever known fields can still be located
/// in an unparseable body. Returns `None` when not a single field matches.
fn salvage_fields(body: &str) -> Option<Value> {
    let patterns = salvage_patterns();
    let mut fields = Map::new();

    if let Some(caps) = patterns.is_correct.captures(body) {
        fields.insert("isCorrect".into(), Value::Bool(&caps[1] == "true"));
    }
    if let Some(caps) = patterns.feedback.captures(body) {
        fields.insert("feedback".into(), Value::String(unescape(&caps[1])));
    }
    if let Some(caps) = patterns.explanation.captures(body) {
        fields.insert("explanation".into(), Value::String(unescape(&caps[1])));
    }
    if let Some(value) = patterns
        .score
        .captures(body)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .and_then(serde_json::Number::from_f64)
    {
        fields.insert("score".into(), Value::Number(value));
    }
    if let Some(value) = patterns
        .confidence
        .captures(body)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .and_then(serde_json::Number::from_f64)
    {
        fields.insert("confidence".into(), Value::Number(value));
    }
    if let Some(caps) = patterns.suggestions.captures(body) {
        let items: Vec<Value> = patterns
            .string_item
            .captures_iter(&caps[1])
            .map(|item| Value::String(unescape(&item[1])))
            .collect();
        if !items.is_empty() {
            fields.insert("suggestions".into(), Value::Array(items));
        }
    }

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

fn unescape(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\n", " ")
}

/// Scrub a single extracted string of leftover JSON artifacts and make sure
/// it leads with a tone marker.
///
/// Marker choice is keyword-based and deliberately tolerant of
/// misclassification; it decorates, it does not decide correctness.
pub fn clean_feedback(raw: &str) -> String {
    static FIELD_PREFIX: OnceLock<Regex> = OnceLock::new();
    let field_prefix = FIELD_PREFIX
        .get_or_init(|| Regex::new(r#"^"?[A-Za-z_]+"?\s*:\s*"#).unwrap());

    let mut text = raw.trim().to_string();
    text = field_prefix.replace(&text, "").to_string();
    text = text
        .trim_matches(|c: char| matches!(c, '"' | '{' | '}' | ',') || c.is_whitespace())
        .to_string();

    if text.is_empty() {
        return format!("{NOTE_MARKER} Keep going!");
    }
    if has_marker(&text) {
        return text;
    }
    format!("{} {}", tone_marker(&text), text)
}

fn has_marker(text: &str) -> bool {
    [AFFIRM_MARKER, WARN_MARKER, NOTE_MARKER, HINT_MARKER]
        .iter()
        .any(|marker| text.starts_with(marker))
}

fn tone_marker(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    // Negative words first: "incorrect" must not match on "correct".
    const NEGATIVE: [&str; 7] = [
        "incorrect",
        "invalid",
        "wrong",
        "mistake",
        "error",
        "not quite",
        "careful",
    ];
    const POSITIVE: [&str; 8] = [
        "great", "good", "correct", "valid", "nice", "excellent", "perfect", "well done",
    ];
    if NEGATIVE.iter().any(|w| lower.contains(w)) {
        WARN_MARKER
    } else if POSITIVE.iter().any(|w| lower.contains(w)) {
        AFFIRM_MARKER
    } else {
        NOTE_MARKER
    }
}

/// Truncate to approximately `max_bytes` without splitting a UTF-8 character.
pub fn excerpt(text: &str, max_bytes: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max_bytes {
        return trimmed.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", trimmed[..end].trim_end())
}
