//! Experiments: a named, salted collection of audiences declaring a fixed set of variable
//! names (C8).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::audience::Audience;
use crate::error::{Error, Result};

/// A named, salted collection of audiences sharing a declared set of variable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// Experiment name, unique within a snapshot.
    pub name: String,
    /// Salt folded into the selection hash alongside each value group's own salt.
    pub salt: String,
    /// Declared set of variable names this experiment is allowed to randomize. Must exactly
    /// equal the union of every audience's value-group keys.
    pub variable_names: Vec<String>,
    /// Ordered audiences; a request is routed to the first whose constraints are met. See
    /// [`crate::service`].
    pub audiences: Vec<Audience>,
    /// Whether this experiment currently participates in assignment.
    pub enabled: bool,
}

impl Experiment {
    /// Construct a new, enabled experiment with no audiences yet.
    pub fn new(name: impl Into<String>, salt: impl Into<String>) -> Self {
        Experiment {
            name: name.into(),
            salt: salt.into(),
            variable_names: Vec::new(),
            audiences: Vec::new(),
            enabled: true,
        }
    }

    /// Validate the structural invariants of §4.5: non-empty scalars, non-empty
    /// `variable_names`/`audiences`, every audience validates, and `variable_names` exactly
    /// equals the union of every audience's value-group keys (no missing, no extra).
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidExperiment(
                "experiment name must not be empty".to_owned(),
            ));
        }
        if self.salt.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "experiment '{}' salt must not be empty",
                self.name
            )));
        }
        if self.variable_names.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "experiment '{}' must declare at least one variable name",
                self.name
            )));
        }
        if self.audiences.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "experiment '{}' must declare at least one audience",
                self.name
            )));
        }

        for audience in &self.audiences {
            audience.validate()?;
        }

        let declared: BTreeSet<&str> = self.variable_names.iter().map(String::as_str).collect();
        let observed: BTreeSet<&str> = self
            .audiences
            .iter()
            .flat_map(|a| a.value_groups.keys())
            .map(String::as_str)
            .collect();

        let missing: Vec<&str> = declared.difference(&observed).copied().collect();
        let extra: Vec<&str> = observed.difference(&declared).copied().collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "experiment '{}' variable names do not match observed value groups: missing {:?}, extra {:?}",
                self.name, missing, extra
            )));
        }

        Ok(())
    }
}
