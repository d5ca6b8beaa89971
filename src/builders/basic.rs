//! The simple, aligned, and factorial builders: all three share one default audience and differ
//! only in `maximum_variables` and whether variants across variables must line up.

use uuid::Uuid;

use crate::audience::Audience;
use crate::error::{Error, Result};
use crate::experiment::Experiment;
use crate::value_group::ValueGroup;

const ALIGNED_MAXIMUM_VARIABLES: usize = 64;

/// Builds a single-audience `Experiment`, one variable at a time.
///
/// Construct with [`BasicBuilder::simple`], [`BasicBuilder::aligned`], or
/// [`BasicBuilder::factorial`] depending on how variables should relate to each other; see §4.6.
pub struct BasicBuilder {
    audience: Audience,
    experiment_name: String,
    maximum_variables: usize,
    is_factorial: bool,
    first_weights: Option<Vec<u32>>,
}

impl BasicBuilder {
    /// One variable, no alignment concerns.
    pub fn simple(experiment_name: impl Into<String>) -> Self {
        Self::with_limits(experiment_name, 1, false)
    }

    /// Up to 64 variables, all sharing the same selection index per user.
    pub fn aligned(experiment_name: impl Into<String>) -> Self {
        Self::with_limits(experiment_name, ALIGNED_MAXIMUM_VARIABLES, false)
    }

    /// Up to 64 variables, each selected independently.
    pub fn factorial(experiment_name: impl Into<String>) -> Self {
        Self::with_limits(experiment_name, ALIGNED_MAXIMUM_VARIABLES, true)
    }

    fn with_limits(experiment_name: impl Into<String>, maximum_variables: usize, is_factorial: bool) -> Self {
        BasicBuilder {
            audience: Audience::new("default_audience"),
            experiment_name: experiment_name.into(),
            maximum_variables,
            is_factorial,
            first_weights: None,
        }
    }

    /// Add a float-valued variable.
    pub fn add_float(&mut self, variable_name: impl Into<String>, weights: &[u32], values: &[f64]) -> Result<()> {
        let variable_name = variable_name.into();
        self.prevalidate(&variable_name, weights)?;
        let group = ValueGroup::new_float(variable_name.clone(), weights, values)?;
        self.audience.value_groups.insert(variable_name, group);
        Ok(())
    }

    /// Add an int-valued variable.
    pub fn add_int(&mut self, variable_name: impl Into<String>, weights: &[u32], values: &[i64]) -> Result<()> {
        let variable_name = variable_name.into();
        self.prevalidate(&variable_name, weights)?;
        let group = ValueGroup::new_int(variable_name.clone(), weights, values)?;
        self.audience.value_groups.insert(variable_name, group);
        Ok(())
    }

    /// Add a bool-valued variable.
    pub fn add_bool(&mut self, variable_name: impl Into<String>, weights: &[u32], values: &[bool]) -> Result<()> {
        let variable_name = variable_name.into();
        self.prevalidate(&variable_name, weights)?;
        let group = ValueGroup::new_bool(variable_name.clone(), weights, values)?;
        self.audience.value_groups.insert(variable_name, group);
        Ok(())
    }

    fn prevalidate(&mut self, variable_name: &str, weights: &[u32]) -> Result<()> {
        if self.audience.value_groups.contains_key(variable_name) {
            log::error!(target: "assign_core", variable = variable_name, experiment = self.experiment_name.as_str();
                "cannot set the same variable twice");
            return Err(Error::InvalidInput(format!(
                "variable '{variable_name}' already added to this experiment"
            )));
        }

        let number_variables = self.audience.value_groups.len() + 1;
        if number_variables > self.maximum_variables {
            log::error!(target: "assign_core", variable = variable_name, experiment = self.experiment_name.as_str(), maximum_variables = self.maximum_variables;
                "exceeds maximum variables for this experiment flavor");
            return Err(Error::InvalidInput(format!(
                "adding '{variable_name}' would exceed the maximum of {} variables",
                self.maximum_variables
            )));
        }

        if weights.is_empty() {
            log::error!(target: "assign_core", variable = variable_name, experiment = self.experiment_name.as_str();
                "poorly formed weights or values");
            return Err(Error::InvalidInput(
                "weights and values must be non-empty".to_owned(),
            ));
        }

        if !self.is_factorial {
            match &self.first_weights {
                None => self.first_weights = Some(weights.to_vec()),
                Some(first) if first.as_slice() == weights => {}
                Some(_) => {
                    log::error!(target: "assign_core", variable = variable_name, experiment = self.experiment_name.as_str();
                        "aligned experiments should have the same weights");
                    return Err(Error::InvalidInput(
                        "aligned experiments require every variable to share the same weight vector".to_owned(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Assemble and validate the experiment.
    ///
    /// Non-factorial builders replace every value group's salt with one freshly generated UUID
    /// v4, the alignment mechanism described in §4.6: since selection hashes fold in
    /// `valueGroup.salt`, identical salts force identical per-user selection indexes across
    /// variables. Factorial builders leave each group's salt at its default (the variable name),
    /// so variables select independently.
    pub fn build(mut self) -> Result<Experiment> {
        self.post_validate()?;

        let mut variable_names: Vec<String> = self.audience.value_groups.keys().cloned().collect();
        variable_names.sort();

        if !self.is_factorial {
            let salt = Uuid::new_v4().to_string();
            for group in self.audience.value_groups.values_mut() {
                group.salt = salt.clone();
            }
        }

        let experiment = Experiment {
            name: self.experiment_name.clone(),
            salt: self.experiment_name,
            variable_names,
            audiences: vec![self.audience],
            enabled: true,
        };

        experiment.validate()?;
        Ok(experiment)
    }

    fn post_validate(&self) -> Result<()> {
        if self.is_factorial {
            return Ok(());
        }
        let mut expected_len = None;
        for group in self.audience.value_groups.values() {
            let len = group.weighted_values.len();
            match expected_len {
                None => expected_len = Some(len),
                Some(expected) if expected == len => {}
                Some(_) => {
                    return Err(Error::InvalidInput(
                        "non-factorial experiments require every value group to have the same number of weighted values".to_owned(),
                    ))
                }
            }
        }
        Ok(())
    }
}
