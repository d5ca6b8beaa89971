//! The variant values a [`crate::ValueGroup`] can hand back to a caller (C1, C2).

use serde::{Deserialize, Serialize};

/// A value returned to the caller as the outcome of an assignment.
///
/// Exactly one variant is meaningful per instance; there is no implicit coercion between them.
/// `Arbitrary` is a pass-through payload for callers that want to thread opaque JSON through the
/// engine (e.g. a config blob) — it is never compared by the [`crate::resolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ValueWire", into = "ValueWire")]
pub enum Value {
    /// A 64-bit IEEE-754 float.
    Float(f64),
    /// A 64-bit signed integer.
    Int(i64),
    /// A boolean.
    Bool(bool),
    /// An opaque JSON payload, passed through unexamined.
    Arbitrary(serde_json::Value),
}

impl Value {
    /// Returns the float payload, if this is a [`Value::Float`].
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the int payload, if this is a [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the bool payload, if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Wire representation matching the canonical JSON schema: `{ float, int, bool }` with exactly one
/// meaningful key present. Modeled on `eppo_core::ufc::models::TryParse`'s pattern of converting
/// through an intermediate, untagged shape instead of hand-rolling `Serialize`/`Deserialize`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ValueWire {
    Float { float: f64 },
    Int { int: i64 },
    Bool { bool: bool },
    Arbitrary(serde_json::Value),
}

impl From<ValueWire> for Value {
    fn from(wire: ValueWire) -> Self {
        match wire {
            ValueWire::Float { float } => Value::Float(float),
            ValueWire::Int { int } => Value::Int(int),
            ValueWire::Bool { bool } => Value::Bool(bool),
            ValueWire::Arbitrary(v) => Value::Arbitrary(v),
        }
    }
}

impl From<Value> for ValueWire {
    fn from(value: Value) -> Self {
        match value {
            Value::Float(float) => ValueWire::Float { float },
            Value::Int(int) => ValueWire::Int { int },
            Value::Bool(bool) => ValueWire::Bool { bool },
            Value::Arbitrary(v) => ValueWire::Arbitrary(v),
        }
    }
}

/// A value paired with a non-negative weight inside a [`crate::ValueGroup`]'s distribution.
///
/// The order of `WeightedValue`s inside a `ValueGroup` is semantically significant: cumulative
/// weights are computed over this exact order during selection (see
/// [`crate::service::Service::get_variable`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedValue {
    /// Non-negative selection weight. Zero is permitted.
    pub weight: u32,
    /// The value returned if this weighted entry is selected.
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_float() {
        let v = Value::Float(6.0);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"float":6.0}"#);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);
    }

    #[test]
    fn round_trips_int() {
        let v = Value::Int(-3);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"int":-3}"#);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);
    }

    #[test]
    fn round_trips_bool() {
        let v = Value::Bool(true);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"bool":true}"#);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);
    }

    #[test]
    fn arbitrary_passes_through() {
        let v = Value::Arbitrary(serde_json::json!({"nested": [1, 2, 3]}));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);
    }
}
