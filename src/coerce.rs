//! Type coercion rules for permissive validation
//!
//! Applied only in [`ValidationMode::Coerce`](crate::ValidationMode::Coerce)
//! and only when a value's runtime type differs from the target primitive.
//! The table is closed: any conversion not listed here fails rather than
//! passing a value through unchanged.
//!
//! | raw value | target | rule |
//! |---|---|---|
//! | numeric string | integer | base-10 integer literal parse |
//! | numeric string | float | decimal parse |
//! | "true"/"false"/"1"/"0"/"yes"/"no"/"on"/"off" | boolean | fixed table, case-insensitive |
//! | integer | float | widen, always succeeds |

use serde_json::{Number, Value};

use crate::schema::TypeSpec;

/// Attempt to coerce `value` to the target primitive specifier.
///
/// Returns the canonical typed value on success, `None` when the value
/// falls outside the coercion table. Callers report the failure as
/// `coercion_failed` at the value's path.
pub fn coerce(value: &Value, target: &TypeSpec) -> Option<Value> {
    match target {
        TypeSpec::Integer => coerce_integer(value),
        TypeSpec::Float => coerce_float(value),
        TypeSpec::Boolean => coerce_boolean(value),
        // string targets accept only strings; no stringification of other types
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .map(|n| Value::Number(Number::from(n))),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Number::from_f64)
            .map(Value::Number),
        Value::Number(n) if n.is_i64() => {
            // integer -> float widening always succeeds
            Number::from_f64(n.as_i64()? as f64).map(Value::Number)
        }
        _ => None,
    }
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}
