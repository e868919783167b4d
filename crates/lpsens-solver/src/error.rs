use thiserror::Error;

use crate::model::ModelError;
use crate::solution::{Solution, SolutionStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Malformed model: {0}")]
    MalformedModel(#[from] ModelError),
    #[error("The problem is infeasible")]
    Infeasible,
    #[error("The problem is unbounded")]
    Unbounded,
    /// The pivot budget ran out before feasibility could be decided
    #[error("Pivot budget exhausted before a feasible basis was found")]
    NumericDegeneracy,
    #[error("Perturbation fraction must lie strictly between 0 and 1, got {0}")]
    InvalidPerturbation(f64),
    #[error("Basis state does not belong to this model")]
    BasisMismatch,
}

impl SolveError {
    /// Error for a non-optimal solution, `None` when it is optimal.
    pub fn from_solution(solution: &Solution) -> Option<Self> {
        match solution.status {
            SolutionStatus::Optimal => None,
            SolutionStatus::Infeasible if solution.degraded => Some(SolveError::NumericDegeneracy),
            SolutionStatus::Infeasible => Some(SolveError::Infeasible),
            SolutionStatus::Unbounded => Some(SolveError::Unbounded),
        }
    }
}
