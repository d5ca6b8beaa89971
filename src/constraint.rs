//! Constraints: the predicates an [`crate::Audience`] uses to decide who belongs to it (C4).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The closed set of comparison operators a [`Constraint`] may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Equal.
    #[serde(rename = "EQ")]
    Eq,
    /// Not equal.
    #[serde(rename = "NEQ")]
    Neq,
    /// Less than.
    #[serde(rename = "LT")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "LTE")]
    Lte,
    /// Greater than.
    #[serde(rename = "GT")]
    Gt,
    /// Greater than or equal.
    #[serde(rename = "GTE")]
    Gte,
    /// Set membership.
    #[serde(rename = "CONTAINS")]
    Contains,
    /// Negated set membership.
    #[serde(rename = "NCONTAINS")]
    NContains,
}

/// The comparison value carried by a [`Constraint`].
///
/// Untagged on the wire: a JSON integer decodes as `Int`, a JSON float as `Float`, a JSON string
/// as `String`, and a JSON array of strings as `StringList`. `Int` is tried before `Float` so that
/// constraint authors who write `3` (not `3.0`) get integer semantics during promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    /// An integer comparison value.
    Int(i64),
    /// A float comparison value.
    Float(f64),
    /// A single string comparison value (`EQ`/`NEQ` only).
    String(String),
    /// A list of strings (`CONTAINS`/`NCONTAINS` only).
    StringList(Vec<String>),
}

impl From<i64> for ConstraintValue {
    fn from(v: i64) -> Self {
        ConstraintValue::Int(v)
    }
}
impl From<f64> for ConstraintValue {
    fn from(v: f64) -> Self {
        ConstraintValue::Float(v)
    }
}
impl From<&str> for ConstraintValue {
    fn from(v: &str) -> Self {
        ConstraintValue::String(v.to_owned())
    }
}
impl From<String> for ConstraintValue {
    fn from(v: String) -> Self {
        ConstraintValue::String(v)
    }
}
impl From<Vec<String>> for ConstraintValue {
    fn from(v: Vec<String>) -> Self {
        ConstraintValue::StringList(v)
    }
}
impl From<Vec<&str>> for ConstraintValue {
    fn from(v: Vec<&str>) -> Self {
        ConstraintValue::StringList(v.into_iter().map(str::to_owned).collect())
    }
}

/// A predicate: attribute key, operator, comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// The context attribute key this constraint inspects.
    pub key: String,
    /// The comparison operator.
    pub operator: Operator,
    /// The value to compare the attribute against.
    pub value: ConstraintValue,
}

impl Constraint {
    /// Construct a new constraint.
    pub fn new(key: impl Into<String>, operator: Operator, value: impl Into<ConstraintValue>) -> Self {
        Constraint {
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    /// Validate the structural invariant of §4.4: non-empty key. `operator` is validated by
    /// construction (a closed enum) and `value` is always present (a non-optional field), so
    /// neither needs a runtime check here.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(Error::InvalidExperiment(
                "constraint key must be specified".to_owned(),
            ));
        }
        Ok(())
    }
}
