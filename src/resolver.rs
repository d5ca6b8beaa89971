//! Resolves a single [`Constraint`] against a [`Context`] (C6).
//!
//! This is the part of the Go original (`constraint/resolver.go`) that did the most type
//! switching; the rewrite collapses `resolveFloat64`/`resolveInt64`/`resolveString` plus the two
//! `force*` helpers into exhaustive matches over [`AttributeValue`] and [`ConstraintValue`].

use crate::attributes::{AttributeValue, Context};
use crate::constraint::{Constraint, ConstraintValue, Operator};
use crate::error::{Error, Result};

/// Evaluate `constraint` against `context`, per §4.4.
///
/// Returns `Ok(true)`/`Ok(false)` when the constraint can be meaningfully evaluated, and `Err` when
/// the key is missing from the context or the attribute/constraint-value/operator combination is
/// not one defined by §4.4 (e.g. `CONTAINS` on a numeric attribute, or a boolean attribute).
pub fn resolve(constraint: &Constraint, context: &dyn Context) -> Result<bool> {
    let attribute = context
        .value(&constraint.key)
        .ok_or_else(|| Error::AttributeMissing(constraint.key.clone()))?;

    match attribute {
        AttributeValue::Float(value) => resolve_float(&constraint.key, *value, constraint),
        AttributeValue::Int(value) => resolve_int(&constraint.key, *value, constraint),
        AttributeValue::String(value) => resolve_string(&constraint.key, value, constraint),
        AttributeValue::Bool(_) | AttributeValue::StringList(_) => Err(Error::TypeMismatch {
            key: constraint.key.clone(),
            reason: "unknown type".to_owned(),
        }),
    }
}

fn resolve_float(key: &str, value: f64, constraint: &Constraint) -> Result<bool> {
    let rhs = match &constraint.value {
        ConstraintValue::Float(v) => *v,
        // cross-family widening: int constraint value against a float attribute
        ConstraintValue::Int(v) => *v as f64,
        other => {
            return Err(Error::TypeMismatch {
                key: key.to_owned(),
                reason: format!("could not force {other:?} to float64"),
            })
        }
    };
    compare_float(key, constraint.operator, value, rhs)
}

fn resolve_int(key: &str, value: i64, constraint: &Constraint) -> Result<bool> {
    let rhs = match &constraint.value {
        ConstraintValue::Int(v) => *v,
        // cross-family widening: float constraint value against an int attribute, truncated
        // toward zero (Rust's `as` cast on a finite, in-range f64 truncates toward zero).
        ConstraintValue::Float(v) => *v as i64,
        other => {
            return Err(Error::TypeMismatch {
                key: key.to_owned(),
                reason: format!("could not force {other:?} to int64"),
            })
        }
    };
    compare_int(key, constraint.operator, value, rhs)
}

fn resolve_string(key: &str, value: &str, constraint: &Constraint) -> Result<bool> {
    match &constraint.value {
        ConstraintValue::String(rhs) => match constraint.operator {
            Operator::Eq => Ok(value == rhs),
            Operator::Neq => Ok(value != rhs),
            op => Err(Error::TypeMismatch {
                key: key.to_owned(),
                reason: format!("operator not available for string comparison: {op:?}"),
            }),
        },
        ConstraintValue::StringList(values) => {
            let found = values.iter().any(|v| v == value);
            match constraint.operator {
                Operator::Contains => Ok(found),
                Operator::NContains => Ok(!found),
                op => Err(Error::TypeMismatch {
                    key: key.to_owned(),
                    reason: format!("operator not available for string comparison: {op:?}"),
                }),
            }
        }
        other => Err(Error::TypeMismatch {
            key: key.to_owned(),
            reason: format!("could not compare string attribute with {other:?}"),
        }),
    }
}

fn compare_float(key: &str, operator: Operator, left: f64, right: f64) -> Result<bool> {
    match operator {
        Operator::Eq => Ok(left == right),
        Operator::Neq => Ok(left != right),
        Operator::Lt => Ok(left < right),
        Operator::Lte => Ok(left <= right),
        Operator::Gt => Ok(left > right),
        Operator::Gte => Ok(left >= right),
        Operator::Contains | Operator::NContains => Err(Error::TypeMismatch {
            key: key.to_owned(),
            reason: "operator not available for numeric comparison".to_owned(),
        }),
    }
}

fn compare_int(key: &str, operator: Operator, left: i64, right: i64) -> Result<bool> {
    match operator {
        Operator::Eq => Ok(left == right),
        Operator::Neq => Ok(left != right),
        Operator::Lt => Ok(left < right),
        Operator::Lte => Ok(left <= right),
        Operator::Gt => Ok(left > right),
        Operator::Gte => Ok(left >= right),
        Operator::Contains | Operator::NContains => Err(Error::TypeMismatch {
            key: key.to_owned(),
            reason: "operator not available for numeric comparison".to_owned(),
        }),
    }
}
