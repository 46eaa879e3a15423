//! Coercion of loosely-typed webhook values into strict domain inputs.
//!
//! The NLU service does not distinguish integral from floating numbers: a
//! quantity of 3 may arrive as `3` or `3.0`, and a carrier id echoed through
//! a client round-trip may come back as `7.0`. All functions are pure and
//! signal "absent or invalid" with `None`; re-prompt wording is the
//! caller's business.

use serde_json::Value;

/// Numeric-or-integral value to `i64`, truncating a fractional part the way
/// the upstream float representation demands (`3.0` -> 3).
pub fn integer(value: Option<&Value>) -> Option<i64> {
    let number = match value? {
        Value::Number(number) => number,
        _ => return None,
    };

    number.as_i64().or_else(|| number.as_f64().map(|float| float.trunc() as i64))
}

/// Same dual representation, used for entity identifiers.
pub fn identifier(value: Option<&Value>) -> Option<i64> {
    integer(value)
}

/// Non-empty string value, trimmed and NBSP-normalized.
pub fn text(value: Option<&Value>) -> Option<String> {
    let raw = value?.as_str()?;
    let cleaned = clean_text(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Trim surrounding whitespace and replace non-breaking spaces (U+00A0)
/// with ordinary spaces; rich-text widgets routinely inject them.
pub fn clean_text(raw: &str) -> String {
    raw.trim().replace('\u{a0}', " ")
}
