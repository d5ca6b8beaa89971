//! The assignment service (C9): snapshot storage, diagnostics, and the `GetVariable` algorithm.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::audience::Audience;
use crate::error::{Error, Result};
use crate::experiment::Experiment;
use crate::hash::fnv1a32;
use crate::resolver;
use crate::value::Value;

const DENOMINATOR: u32 = 10_000;

/// The outcome of a successful [`Service::get_variable`] call: owned, cloned copies of the
/// experiment, audience, and value that produced the assignment, since the snapshot behind them
/// may be replaced by a concurrent [`Service::reload`] the instant the lock is released.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentResult {
    /// The experiment that accepted this user.
    pub experiment: Experiment,
    /// The audience within that experiment that accepted this user.
    pub audience: Audience,
    /// The value selected (or control, on an exposure miss or zero-weight distribution).
    pub value: Value,
}

/// Receives structured detail about assignment-time events that must not abort the request:
/// constraint-resolver errors encountered while routing a user to an audience.
///
/// Modeled after the logging-callback pattern used elsewhere in this ecosystem for
/// fire-and-forget telemetry: implementations must not block or panic.
pub trait DiagnosticsSink {
    /// Called once per constraint-resolution error encountered while searching for an
    /// accepting audience, naming the constraint `key` that failed to resolve. The request
    /// continues regardless of what this returns.
    fn on_resolver_error(&self, experiment: &str, audience: &str, key: &str, error: &Error);
}

/// A [`DiagnosticsSink`] that discards every event. The default when none is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnosticsSink;

impl DiagnosticsSink for NoopDiagnosticsSink {
    fn on_resolver_error(&self, _experiment: &str, _audience: &str, _key: &str, _error: &Error) {}
}

impl<T: Fn(&str, &str, &str, &Error)> DiagnosticsSink for T {
    fn on_resolver_error(&self, experiment: &str, audience: &str, key: &str, error: &Error) {
        self(experiment, audience, key, error)
    }
}

#[derive(Debug, Default, Clone)]
struct Snapshot {
    experiments: Vec<Experiment>,
    variable_index: HashMap<String, Vec<usize>>,
}

impl Snapshot {
    fn build(experiments: Vec<Experiment>) -> Self {
        let mut variable_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, experiment) in experiments.iter().enumerate() {
            for variable_name in &experiment.variable_names {
                variable_index
                    .entry(variable_name.clone())
                    .or_default()
                    .push(i);
            }
        }
        Snapshot {
            experiments,
            variable_index,
        }
    }
}

/// Holds the currently active set of experiments and answers `get_variable` requests against it.
///
/// State changes only through [`Service::reload`], which atomically replaces the snapshot; no
/// entity is mutated after being placed into one. Reads and writes are synchronized with an
/// `RwLock` so that concurrent `get_variable` calls never observe a torn snapshot.
pub struct Service<D = NoopDiagnosticsSink> {
    snapshot: RwLock<Snapshot>,
    diagnostics: D,
}

impl Service<NoopDiagnosticsSink> {
    /// Construct an empty service with no diagnostics sink.
    pub fn new() -> Self {
        Service {
            snapshot: RwLock::new(Snapshot::default()),
            diagnostics: NoopDiagnosticsSink,
        }
    }
}

impl Default for Service<NoopDiagnosticsSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DiagnosticsSink> Service<D> {
    /// Construct an empty service reporting constraint-resolution errors to `diagnostics`.
    pub fn with_diagnostics(diagnostics: D) -> Self {
        Service {
            snapshot: RwLock::new(Snapshot::default()),
            diagnostics,
        }
    }

    /// Atomically replace the active snapshot. Each experiment must already have passed
    /// [`Experiment::validate`]; this method does not re-validate, mirroring the contract that
    /// builders produce validated experiments before they become observable.
    pub fn reload(&self, experiments: Vec<Experiment>) {
        let snapshot = Snapshot::build(experiments);
        let mut slot = self
            .snapshot
            .write()
            .expect("thread holding snapshot lock should not panic");
        *slot = snapshot;
    }

    /// Resolve `variable_name` for `user_id`, optionally evaluating audience constraints against
    /// `context`.
    ///
    /// Candidate experiments are tried in load order; within each, audiences are tried in
    /// declared order. The first audience whose constraints all hold (vacuously true if it has
    /// none) wins. A constraint-resolver error is reported to the diagnostics sink and treated as
    /// "constraint not met" for that audience — it never aborts the request.
    pub fn get_variable(
        &self,
        variable_name: &str,
        user_id: &str,
        context: Option<&dyn crate::attributes::Context>,
    ) -> Result<AssignmentResult> {
        let snapshot = self
            .snapshot
            .read()
            .expect("thread holding snapshot lock should not panic");

        let candidates = match snapshot.variable_index.get(variable_name) {
            Some(candidates) => candidates,
            None => {
                log::trace!(target: "assign_core", variable = variable_name, user_id;
                    "no experiment declares this variable");
                return Err(Error::NoSuchVariable(variable_name.to_owned()));
            }
        };

        for &i in candidates {
            let experiment = &snapshot.experiments[i];
            if !experiment.enabled {
                continue;
            }

            for audience in &experiment.audiences {
                if !audience.enabled {
                    continue;
                }

                if self.audience_accepts(experiment, audience, context) {
                    let value =
                        Self::select_value(experiment, audience, variable_name, user_id)?;
                    log::trace!(target: "assign_core",
                        variable = variable_name,
                        user_id,
                        experiment = experiment.name.as_str(),
                        audience = audience.name.as_str();
                        "resolved a variable assignment");
                    return Ok(AssignmentResult {
                        experiment: experiment.clone(),
                        audience: audience.clone(),
                        value,
                    });
                }
            }
        }

        log::trace!(target: "assign_core", variable = variable_name, user_id;
            "no audience accepted this request");
        Err(Error::NoMatch)
    }

    fn audience_accepts(
        &self,
        experiment: &Experiment,
        audience: &Audience,
        context: Option<&dyn crate::attributes::Context>,
    ) -> bool {
        for constraint in &audience.constraints {
            let met = match context {
                Some(context) => resolver::resolve(constraint, context),
                None => Err(Error::AttributeMissing(constraint.key.clone())),
            };
            match met {
                Ok(true) => continue,
                Ok(false) => return false,
                Err(err) => {
                    self.diagnostics.on_resolver_error(
                        &experiment.name,
                        &audience.name,
                        &constraint.key,
                        &err,
                    );
                    return false;
                }
            }
        }
        true
    }

    fn select_value(
        experiment: &Experiment,
        audience: &Audience,
        variable_name: &str,
        user_id: &str,
    ) -> Result<Value> {
        let value_group = audience.value_groups.get(variable_name).ok_or_else(|| {
            Error::Internal(format!(
                "value group for variable '{variable_name}' missing from accepting audience '{}'",
                audience.name
            ))
        })?;

        let hash = fnv1a32(&[experiment.salt.as_str(), value_group.salt.as_str(), user_id]);

        let fraction = f64::from(hash % DENOMINATOR) / f64::from(DENOMINATOR);
        if fraction > audience.exposure {
            return Ok(value_group.control_value.clone());
        }

        let mut cumulative = 0u32;
        let cumulative_weights: Vec<u32> = value_group
            .weighted_values
            .iter()
            .map(|wv| {
                cumulative += wv.weight;
                cumulative
            })
            .collect();
        let weight_sum = cumulative;

        if weight_sum == 0 {
            log::warn!(target: "assign_core",
                experiment = experiment.name.as_str(),
                audience = audience.name.as_str(),
                variable = variable_name;
                "value group weight sum is zero, returning control value");
            return Ok(value_group.control_value.clone());
        }

        let selector = hash % weight_sum;
        for (cumulative_weight, wv) in cumulative_weights.iter().zip(&value_group.weighted_values) {
            if selector < *cumulative_weight {
                return Ok(wv.value.clone());
            }
        }

        Err(Error::Internal(
            "weighted selection exhausted distribution without a match".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attributes, AttributeValue};
    use crate::value_group::ValueGroup;

    fn single_audience_experiment(weights: &[u32], values: &[f64]) -> Experiment {
        let mut experiment = Experiment::new("exp", "exp_salt");
        experiment.variable_names.push("v1".to_owned());
        let mut audience = Audience::new("default_audience");
        audience
            .value_groups
            .insert("v1".to_owned(), ValueGroup::new_float("v1", weights, values).unwrap());
        experiment.audiences.push(audience);
        experiment
    }

    #[test]
    fn forced_last_value() {
        let service = Service::new();
        service.reload(vec![single_audience_experiment(&[0, 0, 1], &[4.0, 5.0, 6.0])]);

        for user in ["alice", "bob", "carol", "dave"] {
            let result = service.get_variable("v1", user, None).unwrap();
            assert_eq!(result.value, Value::Float(6.0));
        }
    }

    #[test]
    fn zero_weights_yields_control() {
        let service = Service::new();
        service.reload(vec![single_audience_experiment(&[0, 0, 0], &[1.0, 2.0, 3.0])]);

        for user in ["alice", "bob", "carol"] {
            let result = service.get_variable("v1", user, None).unwrap();
            assert_eq!(result.value, Value::Float(1.0));
        }
    }

    #[test]
    fn unknown_variable_is_error() {
        let service = Service::new();
        service.reload(vec![single_audience_experiment(&[1], &[1.0])]);
        assert!(matches!(
            service.get_variable("missing", "alice", None),
            Err(Error::NoSuchVariable(_))
        ));
    }

    #[test]
    fn exposure_zero_returns_control_to_everyone() {
        let mut experiment = single_audience_experiment(&[1, 1, 1], &[1.0, 2.0, 3.0]);
        experiment.audiences[0].exposure = 0.0;
        let service = Service::new();
        service.reload(vec![experiment]);

        for user in ["a", "b", "c", "d", "e"] {
            let result = service.get_variable("v1", user, None).unwrap();
            assert_eq!(result.value, Value::Float(1.0));
        }
    }

    #[test]
    fn constraint_routing() {
        use crate::constraint::{Constraint, Operator};

        let mut experiment = Experiment::new("exp", "exp_salt");
        experiment.variable_names.push("v1".to_owned());

        let mut audience_a = Audience::new("A");
        audience_a.constraints.push(Constraint::new("country", Operator::Eq, "USA"));
        audience_a
            .constraints
            .push(Constraint::new("temperature", Operator::Gte, 70i64));
        audience_a
            .value_groups
            .insert("v1".to_owned(), ValueGroup::new_int("v1", &[1], &[1]).unwrap());

        let mut audience_b = Audience::new("B");
        audience_b.constraints.push(Constraint::new("country", Operator::Eq, "ITALY"));
        audience_b.constraints.push(Constraint::new(
            "food",
            Operator::Contains,
            vec!["banana".to_owned(), "apple".to_owned()],
        ));
        audience_b
            .value_groups
            .insert("v1".to_owned(), ValueGroup::new_int("v1", &[1], &[2]).unwrap());

        let mut audience_c = Audience::new("C");
        audience_c
            .value_groups
            .insert("v1".to_owned(), ValueGroup::new_int("v1", &[1], &[3]).unwrap());

        experiment.audiences = vec![audience_a, audience_b, audience_c];

        let service = Service::new();
        service.reload(vec![experiment]);

        let ctx_usa: Attributes = [
            ("country".to_owned(), AttributeValue::from("USA")),
            ("temperature".to_owned(), AttributeValue::Int(75)),
        ]
        .into_iter()
        .collect();
        let result = service.get_variable("v1", "u1", Some(&ctx_usa)).unwrap();
        assert_eq!(result.audience.name, "A");

        let ctx_italy: Attributes = [
            ("country".to_owned(), AttributeValue::from("ITALY")),
            ("food".to_owned(), AttributeValue::from("banana")),
        ]
        .into_iter()
        .collect();
        let result = service.get_variable("v1", "u1", Some(&ctx_italy)).unwrap();
        assert_eq!(result.audience.name, "B");

        let ctx_canada: Attributes = [("country".to_owned(), AttributeValue::from("CANADA"))]
            .into_iter()
            .collect();
        let result = service.get_variable("v1", "u1", Some(&ctx_canada)).unwrap();
        assert_eq!(result.audience.name, "C");
    }

    #[test]
    fn aligned_pair_shares_selection_index() {
        let mut experiment = Experiment::new("exp", "exp_salt");
        experiment.variable_names.push("int_1".to_owned());
        experiment.variable_names.push("int_2".to_owned());

        let mut audience = Audience::new("default_audience");
        let mut vg1 = ValueGroup::new_int("int_1", &[10, 1, 1], &[1, 2, 3]).unwrap();
        let mut vg2 = ValueGroup::new_int("int_2", &[10, 1, 1], &[1, 2, 3]).unwrap();
        let shared_salt = "aligned-salt".to_owned();
        vg1.salt = shared_salt.clone();
        vg2.salt = shared_salt;
        audience.value_groups.insert("int_1".to_owned(), vg1);
        audience.value_groups.insert("int_2".to_owned(), vg2);
        experiment.audiences.push(audience);

        let service = Service::new();
        service.reload(vec![experiment]);

        let mut seen = std::collections::HashSet::new();
        for i in 0..100 {
            let user = format!("user-{i}");
            let a = service.get_variable("int_1", &user, None).unwrap();
            let b = service.get_variable("int_2", &user, None).unwrap();
            assert_eq!(a.value, b.value);
            seen.insert(a.value);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn factorial_pair_produces_all_pairwise_products() {
        // S5: factorial experiment, int_1 = [2,3,5] weights [1,1,1], int_2 = [7,11] weights
        // [1,1]. Over 100 distinct userIDs, all 6 pairwise products should appear at least once.
        let mut experiment = Experiment::new("exp", "exp_salt");
        experiment.variable_names.push("int_1".to_owned());
        experiment.variable_names.push("int_2".to_owned());

        let mut audience = Audience::new("default_audience");
        let vg1 = ValueGroup::new_int("int_1", &[1, 1, 1], &[2, 3, 5]).unwrap();
        let vg2 = ValueGroup::new_int("int_2", &[1, 1], &[7, 11]).unwrap();
        // Factorial: each value group keeps its own salt (defaulted to its variable name) so
        // the two variables select independently instead of sharing a selection index.
        audience.value_groups.insert("int_1".to_owned(), vg1);
        audience.value_groups.insert("int_2".to_owned(), vg2);
        experiment.audiences.push(audience);

        let service = Service::new();
        service.reload(vec![experiment]);

        let mut products = std::collections::HashSet::new();
        for i in 0..100 {
            let user = format!("user-{i}");
            let a = service.get_variable("int_1", &user, None).unwrap();
            let b = service.get_variable("int_2", &user, None).unwrap();
            let (a, b) = (a.value.as_int().unwrap(), b.value.as_int().unwrap());
            products.insert(a * b);
        }

        let expected: std::collections::HashSet<i64> =
            [14, 22, 21, 33, 35, 55].into_iter().collect();
        assert_eq!(products, expected);
    }

    #[test]
    fn diagnostics_sink_observes_resolver_errors_and_keeps_searching() {
        use crate::constraint::{Constraint, Operator};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut experiment = Experiment::new("exp", "exp_salt");
        experiment.variable_names.push("v1".to_owned());

        let mut audience_a = Audience::new("A");
        audience_a.constraints.push(Constraint::new("flag", Operator::Eq, "x"));
        audience_a
            .value_groups
            .insert("v1".to_owned(), ValueGroup::new_int("v1", &[1], &[1]).unwrap());

        let mut audience_b = Audience::new("B");
        audience_b
            .value_groups
            .insert("v1".to_owned(), ValueGroup::new_int("v1", &[1], &[2]).unwrap());

        experiment.audiences = vec![audience_a, audience_b];

        let errors_seen = Arc::new(AtomicUsize::new(0));
        let errors_seen_clone = errors_seen.clone();
        let keys_seen: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let keys_seen_clone = keys_seen.clone();
        let service = Service::with_diagnostics(
            move |_exp: &str, _aud: &str, key: &str, _err: &Error| {
                errors_seen_clone.fetch_add(1, Ordering::SeqCst);
                keys_seen_clone.lock().unwrap().push(key.to_owned());
            },
        );
        service.reload(vec![experiment]);

        let ctx: Attributes = [("flag".to_owned(), AttributeValue::Bool(true))]
            .into_iter()
            .collect();
        let result = service.get_variable("v1", "u1", Some(&ctx)).unwrap();
        assert_eq!(result.audience.name, "B");
        assert_eq!(errors_seen.load(Ordering::SeqCst), 1);
        assert_eq!(keys_seen.lock().unwrap().as_slice(), ["flag"]);
    }
}
