//! Lenient accessors for loosely-typed JSON objects.
//!
//! The timing software is not consistent about types across versions: numbers
//! are sometimes written as strings and booleans as `"True"`. These helpers
//! accept either and treat `null` the same as an absent key.

use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

/// Whether `key` is present with a non-null value.
pub(crate) fn has(obj: &Object, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

/// A non-empty string field. Numbers are rendered to strings.
pub(crate) fn string(obj: &Object, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A numeric field, accepting numeric strings.
pub(crate) fn float(obj: &Object, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// A non-negative whole-number field.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "range is checked before the cast"
)]
pub(crate) fn unsigned(obj: &Object, key: &str) -> Option<u32> {
    let value = float(obj, key)?;
    if value < 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value.round() as u32)
}

/// A signed whole-number field.
#[expect(
    clippy::cast_possible_truncation,
    reason = "range is checked before the cast"
)]
pub(crate) fn integer(obj: &Object, key: &str) -> Option<i64> {
    if let Some(n) = obj.get(key).and_then(Value::as_i64) {
        return Some(n);
    }
    let value = float(obj, key)?;
    if value.abs() > 9.0e15 {
        return None;
    }
    Some(value.round() as i64)
}

/// A boolean field, accepting `"true"`/`"false"` in any case.
pub(crate) fn boolean(obj: &Object, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
