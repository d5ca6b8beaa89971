//! The advanced builder: multiple named audiences within one experiment, each with its own
//! constraints, sharing the same pre/post checks as [`crate::builders::BasicBuilder`].

use uuid::Uuid;

use crate::audience::Audience;
use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::experiment::Experiment;
use crate::value_group::ValueGroup;

const ALIGNED_MAXIMUM_VARIABLES: usize = 64;

/// Builds a multi-audience `Experiment`. Weight-vector alignment (for non-factorial builders) is
/// tracked across the whole experiment, not per audience, mirroring the original `advancedBuilder`:
/// every variable in every audience must share the same weight vector.
pub struct AdvancedBuilder {
    audiences: Vec<Audience>,
    experiment_name: String,
    maximum_variables: usize,
    is_factorial: bool,
    first_weights: Option<Vec<u32>>,
}

impl AdvancedBuilder {
    /// One variable per audience, no alignment concerns.
    pub fn simple(experiment_name: impl Into<String>) -> Self {
        Self::with_limits(experiment_name, 1, false)
    }

    /// Up to 64 variables across all audiences, all sharing the same selection index per user.
    pub fn aligned(experiment_name: impl Into<String>) -> Self {
        Self::with_limits(experiment_name, ALIGNED_MAXIMUM_VARIABLES, false)
    }

    /// Up to 64 variables across all audiences, each selected independently.
    pub fn factorial(experiment_name: impl Into<String>) -> Self {
        Self::with_limits(experiment_name, ALIGNED_MAXIMUM_VARIABLES, true)
    }

    fn with_limits(experiment_name: impl Into<String>, maximum_variables: usize, is_factorial: bool) -> Self {
        AdvancedBuilder {
            audiences: Vec::new(),
            experiment_name: experiment_name.into(),
            maximum_variables,
            is_factorial,
            first_weights: None,
        }
    }

    /// Add a float-valued variable to the named audience, creating it if it doesn't exist yet.
    pub fn add_floats(
        &mut self,
        variable_name: impl Into<String>,
        audience_name: impl Into<String>,
        weights: &[u32],
        values: &[f64],
    ) -> Result<()> {
        let variable_name = variable_name.into();
        let audience_name = audience_name.into();
        self.prevalidate(&variable_name, &audience_name, weights)?;
        let group = ValueGroup::new_float(variable_name.clone(), weights, values)?;
        self.audience_mut(&audience_name).value_groups.insert(variable_name, group);
        Ok(())
    }

    /// Add an int-valued variable to the named audience, creating it if it doesn't exist yet.
    pub fn add_ints(
        &mut self,
        variable_name: impl Into<String>,
        audience_name: impl Into<String>,
        weights: &[u32],
        values: &[i64],
    ) -> Result<()> {
        let variable_name = variable_name.into();
        let audience_name = audience_name.into();
        self.prevalidate(&variable_name, &audience_name, weights)?;
        let group = ValueGroup::new_int(variable_name.clone(), weights, values)?;
        self.audience_mut(&audience_name).value_groups.insert(variable_name, group);
        Ok(())
    }

    /// Add a bool-valued variable to the named audience, creating it if it doesn't exist yet.
    pub fn add_bools(
        &mut self,
        variable_name: impl Into<String>,
        audience_name: impl Into<String>,
        weights: &[u32],
        values: &[bool],
    ) -> Result<()> {
        let variable_name = variable_name.into();
        let audience_name = audience_name.into();
        self.prevalidate(&variable_name, &audience_name, weights)?;
        let group = ValueGroup::new_bool(variable_name.clone(), weights, values)?;
        self.audience_mut(&audience_name).value_groups.insert(variable_name, group);
        Ok(())
    }

    /// Append a constraint to an already-created audience.
    pub fn add_constraint(&mut self, audience_name: &str, constraint: Constraint) -> Result<()> {
        let audience = self
            .audiences
            .iter_mut()
            .find(|a| a.name == audience_name)
            .ok_or_else(|| {
                Error::InvalidInput(format!("no audience named '{audience_name}' has been created yet"))
            })?;
        audience.constraints.push(constraint);
        Ok(())
    }

    fn audience_mut(&mut self, audience_name: &str) -> &mut Audience {
        if let Some(index) = self.audiences.iter().position(|a| a.name == audience_name) {
            return &mut self.audiences[index];
        }
        self.audiences.push(Audience::new(audience_name));
        self.audiences.last_mut().expect("just pushed")
    }

    fn prevalidate(&mut self, variable_name: &str, audience_name: &str, weights: &[u32]) -> Result<()> {
        let already_present = self
            .audiences
            .iter()
            .find(|a| a.name == audience_name)
            .map(|a| a.value_groups.contains_key(variable_name))
            .unwrap_or(false);
        if already_present {
            log::error!(target: "assign_core", variable = variable_name, audience = audience_name, experiment = self.experiment_name.as_str();
                "cannot set the same variable twice");
            return Err(Error::InvalidInput(format!(
                "variable '{variable_name}' already added to audience '{audience_name}'"
            )));
        }

        let existing_count = self
            .audiences
            .iter()
            .find(|a| a.name == audience_name)
            .map(|a| a.value_groups.len())
            .unwrap_or(0);
        if existing_count + 1 > self.maximum_variables {
            log::error!(target: "assign_core", variable = variable_name, audience = audience_name, maximum_variables = self.maximum_variables;
                "exceeds maximum variables for this experiment flavor");
            return Err(Error::InvalidInput(format!(
                "adding '{variable_name}' would exceed the maximum of {} variables",
                self.maximum_variables
            )));
        }

        if weights.is_empty() {
            return Err(Error::InvalidInput(
                "weights and values must be non-empty".to_owned(),
            ));
        }

        if !self.is_factorial {
            match &self.first_weights {
                None => self.first_weights = Some(weights.to_vec()),
                Some(first) if first.as_slice() == weights => {}
                Some(_) => {
                    log::error!(target: "assign_core", variable = variable_name, audience = audience_name;
                        "aligned experiments should have the same weights");
                    return Err(Error::InvalidInput(
                        "aligned experiments require every variable to share the same weight vector".to_owned(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Assemble and validate the experiment across all named audiences.
    pub fn build(mut self) -> Result<Experiment> {
        self.post_validate()?;

        if !self.is_factorial {
            let salt = Uuid::new_v4().to_string();
            for audience in &mut self.audiences {
                for group in audience.value_groups.values_mut() {
                    group.salt = salt.clone();
                }
            }
        }

        let mut variable_names: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for audience in &self.audiences {
            variable_names.extend(audience.value_groups.keys().cloned());
        }

        let experiment = Experiment {
            name: self.experiment_name.clone(),
            salt: self.experiment_name,
            variable_names: variable_names.into_iter().collect(),
            audiences: self.audiences,
            enabled: true,
        };

        experiment.validate()?;
        Ok(experiment)
    }

    fn post_validate(&self) -> Result<()> {
        if self.is_factorial {
            return Ok(());
        }
        for audience in &self.audiences {
            let mut expected_len = None;
            for group in audience.value_groups.values() {
                let len = group.weighted_values.len();
                match expected_len {
                    None => expected_len = Some(len),
                    Some(expected) if expected == len => {}
                    Some(_) => {
                        return Err(Error::InvalidInput(format!(
                            "audience '{}' has value groups of differing lengths",
                            audience.name
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Operator;

    #[test]
    fn multiple_named_audiences() {
        let mut builder = AdvancedBuilder::simple("exp");
        builder.add_floats("v1", "A", &[1], &[10.0]).unwrap();
        builder
            .add_constraint("A", Constraint::new("country", Operator::Eq, "USA"))
            .unwrap();
        builder.add_floats("v1", "B", &[1], &[20.0]).unwrap();

        let experiment = builder.build().unwrap();
        assert_eq!(experiment.audiences.len(), 2);
        let a = experiment.audiences.iter().find(|a| a.name == "A").unwrap();
        assert_eq!(a.constraints.len(), 1);
    }

    #[test]
    fn add_constraint_to_unknown_audience_fails() {
        let mut builder = AdvancedBuilder::simple("exp");
        let err = builder.add_constraint("missing", Constraint::new("k", Operator::Eq, 1i64));
        assert!(err.is_err());
    }

    #[test]
    fn aligned_weight_equality_checked_across_all_audiences() {
        let mut builder = AdvancedBuilder::aligned("exp");
        builder.add_ints("v1", "A", &[10, 1, 1], &[1, 2, 3]).unwrap();
        assert!(builder.add_ints("v1", "B", &[1, 1, 1], &[4, 5, 6]).is_err());
    }
}
