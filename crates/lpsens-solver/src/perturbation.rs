//! Re-solve based sensitivity estimates.
//!
//! Each objective coefficient and each RHS value is scaled by `1 - pct` and
//! `1 + pct` in turn and the model is solved again from scratch. The figures
//! are independent of the analytic ranging in [`crate::ranging`] and may
//! disagree with it at degenerate or alternate-optimal bases.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::SolveError;
use crate::model::{Model, ModelError};
use crate::simplex::Solver;
use crate::solution::{
    Bound, ConstraintMeasure, ConstraintSensitivity, Perturbed, Solution, VariableMeasure,
    VariableSensitivity,
};

pub const DEFAULT_PCT: f64 = 0.10;

/// Sweep of perturbed re-solves around an optimal solution.
#[derive(Debug, Clone, Copy)]
pub struct PerturbationAnalyzer {
    solver: Solver,
    pct: f64,
    /// Absolute RHS step used when a right-hand side is zero
    zero_rhs_step: f64,
    timeout: Option<Duration>,
}

/// Output of one perturbation sweep
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationResult {
    pub variables: Vec<VariableSensitivity>,
    pub constraints: Vec<ConstraintSensitivity>,
    /// The timeout expired before every re-solve ran
    pub timed_out: bool,
    /// At least one re-solve exhausted its pivot budget
    pub degraded: bool,
}

impl Default for PerturbationAnalyzer {
    fn default() -> Self {
        Self {
            solver: Solver::default(),
            pct: DEFAULT_PCT,
            zero_rhs_step: DEFAULT_PCT,
            timeout: None,
        }
    }
}

/// Sweep state threaded through the individual re-solves
struct Sweep {
    deadline: Option<Instant>,
    timed_out: bool,
    degraded: bool,
}

impl PerturbationAnalyzer {
    pub fn new(solver: Solver) -> Self {
        Self {
            solver,
            ..Self::default()
        }
    }

    pub fn with_pct(mut self, pct: f64) -> Self {
        self.pct = pct;
        self
    }

    pub fn with_zero_rhs_step(mut self, step: f64) -> Self {
        self.zero_rhs_step = step;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the sweep around `solution`, which must be the optimum of `model`.
    pub fn analyze(&self, model: &Model, solution: &Solution) -> Result<PerturbationResult, SolveError> {
        if !(self.pct > 0.0 && self.pct < 1.0) {
            return Err(SolveError::InvalidPerturbation(self.pct));
        }
        if let Some(err) = SolveError::from_solution(solution) {
            return Err(err);
        }
        if solution.values.len() != model.num_variables() {
            return Err(SolveError::BasisMismatch);
        }

        let mut sweep = Sweep {
            deadline: self.timeout.map(|t| Instant::now() + t),
            timed_out: false,
            degraded: false,
        };
        let z_star = solution.objective_value;
        let tol = self.solver.tolerance();

        let mut variables = Vec::with_capacity(model.num_variables());
        for (j, &coefficient) in model.objective().iter().enumerate() {
            let perturbed = if coefficient.abs() <= tol {
                // Scaling a zero coefficient changes nothing
                Perturbed {
                    objective_down: Bound::Finite(z_star),
                    objective_up: Bound::Finite(z_star),
                    relative_change: Bound::Finite(0.0),
                }
            } else {
                let down = self.objective_at(
                    &mut sweep,
                    model.with_objective_coefficient(j, coefficient * (1.0 - self.pct)),
                );
                let up = self.objective_at(
                    &mut sweep,
                    model.with_objective_coefficient(j, coefficient * (1.0 + self.pct)),
                );
                Perturbed {
                    objective_down: down,
                    objective_up: up,
                    relative_change: relative_change(z_star, down, up, tol),
                }
            };
            variables.push(VariableSensitivity {
                variable_index: j,
                current_value: solution.values[j],
                coefficient,
                measure: VariableMeasure::Perturbation(perturbed),
            });
        }

        let mut constraints = Vec::with_capacity(model.num_constraints());
        for (i, constraint) in model.constraints().iter().enumerate() {
            let rhs = constraint.rhs;
            let step = if rhs.abs() <= tol {
                self.zero_rhs_step
            } else {
                self.pct * rhs
            };
            let down = self.objective_at(&mut sweep, model.with_rhs(i, rhs - step));
            let up = self.objective_at(&mut sweep, model.with_rhs(i, rhs + step));

            let shadow_price = match (down, up) {
                (Bound::Finite(zd), Bound::Finite(zu)) => Bound::Finite((zu - zd) / (2.0 * step)),
                (Bound::Finite(zd), _) => Bound::Finite((z_star - zd) / step),
                (_, Bound::Finite(zu)) => Bound::Finite((zu - z_star) / step),
                _ => Bound::Unavailable,
            };

            constraints.push(ConstraintSensitivity {
                constraint_index: i,
                current_rhs: rhs,
                shadow_price,
                measure: ConstraintMeasure::Perturbation(Perturbed {
                    objective_down: down,
                    objective_up: up,
                    relative_change: relative_change(z_star, down, up, tol),
                }),
            });
        }

        if sweep.timed_out {
            warn!("perturbation sweep timed out; remaining entries are unavailable");
        }
        Ok(PerturbationResult {
            variables,
            constraints,
            timed_out: sweep.timed_out,
            degraded: sweep.degraded,
        })
    }

    /// Optimum of one perturbed model, `Unavailable` when it cannot be had.
    fn objective_at(&self, sweep: &mut Sweep, model: Result<Model, ModelError>) -> Bound {
        let model = match model {
            Ok(model) => model,
            Err(err) => {
                // Scaling overflowed; only this side is lost
                debug!("perturbed model rejected: {}", err);
                return Bound::Unavailable;
            }
        };
        if sweep.timed_out || sweep.deadline.is_some_and(|d| Instant::now() >= d) {
            sweep.timed_out = true;
            return Bound::Unavailable;
        }

        let solution = self.solver.solve(&model);
        sweep.degraded |= solution.degraded;
        if solution.is_optimal() && solution.objective_value.is_finite() {
            Bound::Finite(solution.objective_value)
        } else {
            debug!("perturbed re-solve ended {:?}; bound unavailable", solution.status);
            Bound::Unavailable
        }
    }
}

/// Analyze `model` around `solution` with the default solver settings.
pub fn analyze_by_perturbation(
    model: &Model,
    solution: &Solution,
    pct: f64,
) -> Result<(Vec<VariableSensitivity>, Vec<ConstraintSensitivity>), SolveError> {
    let result = PerturbationAnalyzer::default().with_pct(pct).analyze(model, solution)?;
    Ok((result.variables, result.constraints))
}

fn relative_change(z_star: f64, down: Bound, up: Bound, tol: f64) -> Bound {
    let largest = [down, up]
        .iter()
        .filter_map(|b| b.value())
        .map(|z| (z - z_star).abs())
        .fold(None, |acc: Option<f64>, diff| Some(acc.map_or(diff, |a| a.max(diff))));

    match largest {
        None => Bound::Unavailable,
        Some(_) if z_star.abs() <= tol => Bound::Finite(0.0),
        Some(diff) => Bound::Finite(diff / z_star.abs()),
    }
}
