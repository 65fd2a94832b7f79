//! Turns values that came out of the script engine into display strings.
//!
//! Formatting is total: every [`ScriptValue`] yields a string. Structured
//! values follow `JSON.stringify(value, null, 2)`; when that serialization
//! faults (cycles, BigInts, values cut off while marshalling) the caller gets
//! a fixed placeholder instead.

use thiserror::Error;

/// Kinds of primitive the display path prints as-is but JSON cannot hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueKind {
    Symbol,
    BigInt,
}

/// Host-side copy of a script value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Function { name: Option<String> },
    Array(Vec<ScriptValue>),
    /// Own enumerable string-keyed members, in key order.
    Object(Vec<(String, ScriptValue)>),
    Opaque { kind: OpaqueKind, text: String },
    /// An object displayed through the result of its `toJSON` method.
    Replaced(Box<ScriptValue>),
    /// Back-reference to an ancestor of this node.
    Circular,
    /// Marshalling stopped here (too deep, too wide, or a getter threw).
    Truncated { array: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatFault {
    #[error("Converting circular structure to JSON")]
    Circular,
    #[error("Do not know how to serialize a BigInt")]
    BigInt,
    #[error("Value is too large or too deeply nested to serialize")]
    Truncated,
}

/// Render any value for display. Never fails.
pub fn format_value(value: &ScriptValue) -> String {
    match value {
        ScriptValue::Undefined => "undefined".to_string(),
        ScriptValue::Null => "null".to_string(),
        ScriptValue::String(s) => s.clone(),
        ScriptValue::Number(n) => format_number(*n),
        ScriptValue::Bool(b) => b.to_string(),
        ScriptValue::Function { name } => format!(
            "[Function: {}]",
            name.as_deref().filter(|n| !n.is_empty()).unwrap_or("anonymous")
        ),
        ScriptValue::Array(_) => structured_or(value, "[Array]"),
        ScriptValue::Object(_) | ScriptValue::Replaced(_) => structured_or(value, "[Object]"),
        ScriptValue::Opaque { text, .. } => text.clone(),
        ScriptValue::Circular => "[Circular]".to_string(),
        ScriptValue::Truncated { array: true } => "[Array]".to_string(),
        ScriptValue::Truncated { array: false } => "[Object]".to_string(),
    }
}

fn structured_or(value: &ScriptValue, placeholder: &str) -> String {
    match to_json_pretty(value) {
        Ok(Some(json)) => json,
        Ok(None) => placeholder.to_string(),
        Err(fault) => {
            tracing::debug!(%fault, "structured formatting failed, using placeholder");
            placeholder.to_string()
        }
    }
}

/// Serialize like `JSON.stringify(value, null, 2)`.
///
/// `Ok(None)` means the value has no JSON form at all (undefined, functions, symbols).
pub fn to_json_pretty(value: &ScriptValue) -> Result<Option<String>, FormatFault> {
    let mut out = String::new();
    if write_json(value, 0, &mut out)? {
        Ok(Some(out))
    } else {
        Ok(None)
    }
}

/// Returns false when the value is skipped by JSON (caller decides omit vs `null`).
fn write_json(value: &ScriptValue, depth: usize, out: &mut String) -> Result<bool, FormatFault> {
    match value {
        ScriptValue::Undefined
        | ScriptValue::Function { .. }
        | ScriptValue::Opaque {
            kind: OpaqueKind::Symbol,
            ..
        } => return Ok(false),
        ScriptValue::Opaque {
            kind: OpaqueKind::BigInt,
            ..
        } => return Err(FormatFault::BigInt),
        ScriptValue::Circular => return Err(FormatFault::Circular),
        ScriptValue::Truncated { .. } => return Err(FormatFault::Truncated),
        ScriptValue::Replaced(inner) => return write_json(inner, depth, out),
        ScriptValue::Null => out.push_str("null"),
        ScriptValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ScriptValue::Number(n) if n.is_finite() => out.push_str(&format_number(*n)),
        ScriptValue::Number(_) => out.push_str("null"),
        ScriptValue::String(s) => out.push_str(&quote(s)),
        ScriptValue::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return Ok(true);
            }
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                out.push_str(if i == 0 { "\n" } else { ",\n" });
                indent(out, depth + 1);
                if !write_json(item, depth + 1, out)? {
                    out.push_str("null");
                }
            }
            out.push('\n');
            indent(out, depth);
            out.push(']');
        }
        ScriptValue::Object(entries) => {
            let mut wrote_any = false;
            out.push('{');
            for (key, item) in entries {
                let mut member = String::new();
                if !write_json(item, depth + 1, &mut member)? {
                    continue;
                }
                out.push_str(if wrote_any { ",\n" } else { "\n" });
                indent(out, depth + 1);
                out.push_str(&quote(key));
                out.push_str(": ");
                out.push_str(&member);
                wrote_any = true;
            }
            if wrote_any {
                out.push('\n');
                indent(out, depth);
            }
            out.push('}');
        }
    }
    Ok(true)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// JavaScript's canonical Number-to-String conversion.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // covers -0
        return "0".to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }

    let scientific = format!("{:e}", n);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => scientific,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_canonical_forms() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_object_members_skip_undefined() {
        let value = ScriptValue::Object(vec![
            ("a".to_string(), ScriptValue::Number(1.0)),
            ("skip".to_string(), ScriptValue::Undefined),
            ("f".to_string(), ScriptValue::Function { name: None }),
        ]);
        assert_eq!(format_value(&value), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_array_holes_become_null() {
        let value = ScriptValue::Array(vec![
            ScriptValue::Undefined,
            ScriptValue::Number(f64::INFINITY),
        ]);
        assert_eq!(format_value(&value), "[\n  null,\n  null\n]");
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(format_value(&ScriptValue::Array(Vec::new())), "[]");
        assert_eq!(format_value(&ScriptValue::Object(Vec::new())), "{}");
        let only_undefined =
            ScriptValue::Object(vec![("x".to_string(), ScriptValue::Undefined)]);
        assert_eq!(format_value(&only_undefined), "{}");
    }

    #[test]
    fn test_replaced_value_is_serialized() {
        let date = ScriptValue::Replaced(Box::new(ScriptValue::String(
            "1970-01-01T00:00:00.000Z".to_string(),
        )));
        assert_eq!(format_value(&date), "\"1970-01-01T00:00:00.000Z\"");
        assert_eq!(
            format_value(&ScriptValue::Replaced(Box::new(ScriptValue::Undefined))),
            "[Object]"
        );
    }

    #[test]
    fn test_truncated_keeps_container_kind() {
        assert_eq!(format_value(&ScriptValue::Truncated { array: true }), "[Array]");
        assert_eq!(format_value(&ScriptValue::Truncated { array: false }), "[Object]");
    }

    #[test]
    fn test_bigint_member_falls_back() {
        let value = ScriptValue::Object(vec![(
            "n".to_string(),
            ScriptValue::Opaque {
                kind: OpaqueKind::BigInt,
                text: "10n".to_string(),
            },
        )]);
        assert_eq!(to_json_pretty(&value), Err(FormatFault::BigInt));
        assert_eq!(format_value(&value), "[Object]");
    }
}
