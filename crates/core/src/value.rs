//! Field value helpers
//!
//! Record fields are plain `serde_json::Value`s. This module defines how
//! they turn into text for join keys and display, and the non-strict
//! equality used by `field: value` search terms.
//!
//! ## Loose equality
//!
//! A search value is always text, so comparison is text against a typed
//! field value:
//! - strings compare exactly
//! - numbers and booleans compare numerically (`44.6 == "44.6"`,
//!   `true == "1"`)
//! - arrays compare by their comma-joined text
//! - null never matches

use serde_json::{Number, Value as JsonValue};

/// Text of a value as used inside a join key.
///
/// Returns `None` for null, which excludes the record from the key index.
pub fn key_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        other => Some(text(other)),
    }
}

/// Text of a value for display and substring matching.
///
/// Strings are returned without quotes; integral floats drop the trailing
/// `.0` so `1.0` and `1` render the same.
pub fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => number_text(n),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(","),
        JsonValue::Object(_) => "[object Object]".to_string(),
    }
}

/// Non-strict equality between a field value and search text.
pub fn loose_eq(value: &JsonValue, other: &str) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::String(s) => s == other,
        JsonValue::Number(n) => match (n.as_f64(), text_to_number(other)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        JsonValue::Bool(b) => {
            let a = if *b { 1.0 } else { 0.0 };
            text_to_number(other) == Some(a)
        }
        JsonValue::Array(_) | JsonValue::Object(_) => text(value) == other,
    }
}

/// Whether a value counts as present for display.
///
/// Null, `false`, zero, NaN and the empty string are empty.
pub fn is_present(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Numeric value of a field, accepting numeric strings.
///
/// Used for coordinate fields, which CSV uploads often store as text.
pub fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// 2^53: integral floats below this convert to `i64` exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn number_text(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 {
                if f.abs() < MAX_EXACT_INTEGER {
                    return format!("{}", f as i64);
                }
                if f.abs() < 1e21 {
                    return format!("{:.0}", f);
                }
            }
        }
    }
    n.to_string()
}

fn text_to_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok()
}
