//! Dotted/indexed path resolution and canonical value formatting.

use serde_json::Value;

use super::Vars;

/// Resolves `path` (e.g. `order.items[0].name`) against `vars`.
///
/// Returns `None` for any missing key, out-of-range index, or malformed
/// segment.
pub fn lookup<'a>(vars: &'a Vars, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let mut current: Option<&Value> = None;
    for (position, segment) in path.split('.').enumerate() {
        let (key, indexes) = split_segment(segment)?;

        if !key.is_empty() {
            current = Some(match current {
                None if position == 0 => vars.get(key)?,
                Some(Value::Object(map)) => map.get(key)?,
                _ => return None,
            });
        } else if position == 0 {
            return None;
        }

        for index in indexes {
            current = Some(match current {
                Some(Value::Array(items)) => items.get(index)?,
                _ => return None,
            });
        }
    }
    current
}

/// Splits `items[0][1]` into `("items", [0, 1])`.
fn split_segment(segment: &str) -> Option<(&str, Vec<usize>)> {
    let segment = segment.trim();
    let key_end = segment.find('[').unwrap_or(segment.len());
    let key = &segment[..key_end];

    let mut indexes = Vec::new();
    let mut rest = &segment[key_end..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }

    if key.is_empty() && indexes.is_empty() {
        return None;
    }
    Some((key, indexes))
}

/// Formats a value the way it appears in rendered text.
///
/// Null renders empty, booleans as `true`/`false`, integers without a
/// decimal point, floats in their shortest natural form, and composite
/// values as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        Value::String(s) => s.clone(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

/// Truthiness used by bare-path conditions.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Coerces a value to a number for ordered comparisons.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
