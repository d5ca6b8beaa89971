//! Per-variable weighted value distributions (C3).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{Value, WeightedValue};

/// The ordered weighted distribution of variants for one variable inside one audience, plus a
/// fallback control value.
///
/// `salt` starts out equal to `name` and is later overwritten by non-factorial builders to align
/// selection across variables (see [`crate::builders`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueGroup {
    /// Name of the variable this group distributes values for.
    pub name: String,
    /// Salt folded into the selection hash alongside the experiment salt and user id.
    pub salt: String,
    /// Value returned when a user fails exposure, or when all weights are zero.
    pub control_value: Value,
    /// Ordered weighted variants. Order is significant; see [`crate::service`]'s selection
    /// algorithm.
    pub weighted_values: Vec<WeightedValue>,
}

impl ValueGroup {
    /// Build a value group of float variants. `weights` and `values` must be the same (non-zero)
    /// length; the control value is the first entry.
    pub fn new_float(name: impl Into<String>, weights: &[u32], values: &[f64]) -> Result<Self> {
        Self::new(name, weights, values.iter().copied().map(Value::Float))
    }

    /// Build a value group of int variants.
    pub fn new_int(name: impl Into<String>, weights: &[u32], values: &[i64]) -> Result<Self> {
        Self::new(name, weights, values.iter().copied().map(Value::Int))
    }

    /// Build a value group of bool variants.
    pub fn new_bool(name: impl Into<String>, weights: &[u32], values: &[bool]) -> Result<Self> {
        Self::new(name, weights, values.iter().copied().map(Value::Bool))
    }

    fn new(
        name: impl Into<String>,
        weights: &[u32],
        values: impl ExactSizeIterator<Item = Value>,
    ) -> Result<Self> {
        if weights.len() != values.len() || weights.is_empty() {
            return Err(Error::InvalidInput(
                "weights and values must be non-empty and of equal length".to_owned(),
            ));
        }

        let name = name.into();
        let weighted_values: Vec<WeightedValue> = weights
            .iter()
            .zip(values)
            .map(|(&weight, value)| WeightedValue { weight, value })
            .collect();

        let control_value = weighted_values[0].value.clone();

        Ok(ValueGroup {
            salt: name.clone(),
            name,
            control_value,
            weighted_values,
        })
    }

    /// Validate the structural invariants of §3/§4.2: non-empty name and salt, non-empty
    /// weighted-value list.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidExperiment(
                "value group name must not be empty".to_owned(),
            ));
        }
        if self.salt.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "value group '{}' salt must not be empty",
                self.name
            )));
        }
        if self.weighted_values.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "value group '{}' must have at least one weighted value",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_value_is_first_entry() {
        let vg = ValueGroup::new_float("v1", &[0, 0, 1], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(vg.control_value, Value::Float(4.0));
        assert_eq!(vg.salt, "v1");
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(ValueGroup::new_int("v1", &[1, 2], &[1]).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(ValueGroup::new_bool("v1", &[], &[]).is_err());
    }

    #[test]
    fn validate_rejects_empty_name() {
        let mut vg = ValueGroup::new_bool("v1", &[1], &[true]).unwrap();
        vg.name = String::new();
        assert!(vg.validate().is_err());
    }
}
