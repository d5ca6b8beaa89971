//! Named audiences: the unit of constraint routing inside an [`crate::Experiment`] (C7).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::value_group::ValueGroup;

/// A subset of users selected by an ordered sequence of constraints, owning the per-variable
/// value distributions those users draw from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    /// Name of this audience, unique within its experiment.
    pub name: String,
    /// Ordered constraints; all must hold for a user to belong to this audience. Empty means
    /// every user belongs.
    pub constraints: Vec<Constraint>,
    /// Per-variable value distribution, keyed by variable name.
    pub value_groups: HashMap<String, ValueGroup>,
    /// Fraction of admitted users that receive a treatment variant rather than control, in
    /// `[0, 1]`.
    pub exposure: f64,
    /// Whether this audience currently participates in assignment.
    pub enabled: bool,
}

impl Audience {
    /// Construct a new audience with no constraints, full exposure, enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Audience {
            name: name.into(),
            constraints: Vec::new(),
            value_groups: HashMap::new(),
            exposure: 1.0,
            enabled: true,
        }
    }

    /// Validate the structural invariants of §4.5: `exposure` in range, at least one value
    /// group, each value-group key matching its own `name`, and every constraint well-formed.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.exposure) {
            return Err(Error::InvalidExperiment(format!(
                "audience '{}' exposure must be in [0, 1], got {}",
                self.name, self.exposure
            )));
        }
        if self.value_groups.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "audience '{}' must declare at least one value group",
                self.name
            )));
        }

        let mut keys: Vec<&String> = self.value_groups.keys().collect();
        keys.sort();
        for key in keys {
            let group = &self.value_groups[key];
            if &group.name != key {
                return Err(Error::InvalidExperiment(format!(
                    "audience '{}' value group key '{}' does not match its name '{}'",
                    self.name, key, group.name
                )));
            }
            group.validate()?;
        }

        for constraint in &self.constraints {
            constraint.validate()?;
        }

        Ok(())
    }
}
