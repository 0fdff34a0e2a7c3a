//! Typed values produced by option and argument coercion.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A coerced option or argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// True when a raw string spells an affirmative boolean.
    /// Everything outside the convention is false, not an error.
    pub fn truthy(raw: &str) -> bool {
        matches!(raw, "true" | "1" | "yes")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Object(map) => {
                let parts: Vec<String> =
                    map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Parse a raw string as a number, with a readable failure message.
pub(crate) fn coerce_number(flag: &str, raw: &str) -> Result<Value, String> {
    raw.parse::<f64>()
        .map(Value::Num)
        .map_err(|_| format!("{} expects a number, got '{}'", flag, raw))
}

/// Comma-split into an array of strings, trimming each element.
pub(crate) fn coerce_array(raw: &str) -> Value {
    Value::Array(
        raw.split(',')
            .map(|item| Value::Str(item.trim().to_string()))
            .collect(),
    )
}

/// Split on the first `=` into a single-pair object; a bare key maps to
/// `true`.
pub(crate) fn coerce_object(raw: &str) -> Value {
    let mut map = BTreeMap::new();
    match raw.split_once('=') {
        Some((key, value)) => {
            map.insert(key.to_string(), Value::Str(value.to_string()));
        }
        None => {
            map.insert(raw.to_string(), Value::Bool(true));
        }
    }
    Value::Object(map)
}

// ============================================================================
// Tests
// ============================================================================
