mod error;
mod model;
pub mod mps;
mod perturbation;
mod ranging;
mod simplex;
mod solution;
mod strategy;

pub use error::SolveError;
pub use model::{Constraint, Model, ModelError, Relation, Sense};
pub use perturbation::{DEFAULT_PCT, PerturbationAnalyzer, PerturbationResult, analyze_by_perturbation};
pub use ranging::analyze;
pub use simplex::{BasisState, Solver};
pub use solution::{
    Bound, ConstraintMeasure, ConstraintSensitivity, Interval, Perturbed, SensitivityReport, Solution,
    SolutionStatus, StrategyKind, VariableMeasure, VariableSensitivity,
};
pub use strategy::Strategy;
