//! Experiment builders (C10): the integrity rules the service depends on live here rather than
//! in [`crate::Experiment::validate`], because some of them (aligned-weight-vector equality,
//! salt unification) only make sense while an experiment is still under construction.

mod advanced;
mod basic;

pub use advanced::AdvancedBuilder;
pub use basic::BasicBuilder;
