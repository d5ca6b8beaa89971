//! Context attribute values (C5) — the dynamically typed side of constraint resolution.

use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// A heterogeneous map of attribute name to attribute value, the reference [`Context`]
/// implementation.
pub type Attributes = HashMap<String, AttributeValue>;

/// Runtime type of a single context attribute.
///
/// Mirrors the Go original's use of an untyped `interface{}` as a tagged variant instead, per the
/// rewrite's design notes: the resolver becomes an exhaustive match over this enum rather than a
/// type switch. `Int`/`Float` absorb all integer/float widths the caller might have on hand (the
/// `From` impls below promote every native numeric type into one of the two canonical widths),
/// which is what the Go code did implicitly by boxing `int8`..`int64` and `float32`/`float64` into
/// the same `interface{}` slot.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A signed 64-bit integer (any narrower integer width promotes into this).
    Int(i64),
    /// A 64-bit float (`f32` promotes into this).
    Float(f64),
    /// A boolean. Not comparable by any operator defined in §4.4; resolving a constraint against
    /// a boolean attribute is a type mismatch.
    Bool(bool),
    /// A string.
    String(String),
    /// A list of strings. Not directly resolvable either; lists live on the constraint side
    /// (`ConstraintValue::StringList`) for `CONTAINS`/`NCONTAINS`.
    StringList(Vec<String>),
}

macro_rules! impl_int_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(v: $t) -> Self {
                    AttributeValue::Int(v as i64)
                }
            }
        )*
    };
}
impl_int_from!(i8, i16, i32, u8, u16, u32);

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Float(v as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_owned())
    }
}

impl AttributeValue {
    /// Returns the string payload, if this is a [`AttributeValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Attribute-lookup abstraction the resolver evaluates constraints against.
///
/// A request's context may legitimately be absent (`None`) when no candidate audience declares
/// any constraints; if an audience with constraints is reached and no context was supplied, every
/// lookup simply reports the key missing.
pub trait Context {
    /// Look up `key`, returning `None` if it is absent.
    fn value(&self, key: &str) -> Option<&AttributeValue>;
}

impl Context for Attributes {
    fn value(&self, key: &str) -> Option<&AttributeValue> {
        self.get(key)
    }
}
