//! Loose value conversions used when writing variable values into a config.
//!
//! Variable values come from hand-edited JSON and UI inputs, so a `number`
//! variable may hold `"5"` and a text variable may hold `640`. These helpers
//! convert with the same rules a browser applies to `Number(x)`, `String(x)`
//! and `Boolean(x)`, then re-express the result as JSON.

use serde_json::{Number, Value};
use tracing::warn;

/// Largest integer an f64 represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Convert a value to a JSON number the way `Number(x)` would.
///
/// Integral results become JSON integers so `"5"` maps to `5`, not `5.0`.
/// NaN and infinities have no JSON form and are written as `null`.
pub fn to_number(value: &Value) -> Value {
    let n = numeric_value(value);
    number_from_f64(n).unwrap_or_else(|| {
        warn!("Value {} does not convert to a finite number, writing null", value);
        Value::Null
    })
}

/// The raw `f64` a value converts to; NaN when it has no numeric reading.
pub fn numeric_value(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric_str(s),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric_str(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&trimmed[2..], radix)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }

    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    // f64::from_str also accepts "inf" and "nan", which are not numbers here
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Express an `f64` as JSON, preferring integers for integral values.
///
/// Returns `None` for NaN and infinities.
pub fn number_from_f64(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Render a value as text the way `String(x)` would for scalars.
///
/// Arrays and objects are rendered as compact JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => format_f64(f),
        None => n.to_string(),
    }
}

/// Shortest round-trip digits, in exponent form outside `[1e-6, 1e21)`
/// (`1e+21`, `1.5e-7`).
fn format_f64(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&f.abs()) {
        return format!("{}", f);
    }
    let exp = format!("{:e}", f);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

/// Truthiness as `Boolean(x)` sees it.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
