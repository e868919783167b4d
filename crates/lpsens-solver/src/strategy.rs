use std::time::Duration;

use log::info;

use crate::error::SolveError;
use crate::model::Model;
use crate::perturbation::{DEFAULT_PCT, PerturbationAnalyzer};
use crate::ranging;
use crate::simplex::Solver;
use crate::solution::{SensitivityReport, StrategyKind};

/// How sensitivity figures are derived once the model is solved
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Strategy {
    /// Dual values and ranging read off the terminal tableau
    #[default]
    Analytic,
    /// Re-solve with each parameter scaled by `1 ± pct`
    Perturbation {
        pct: f64,
        /// Stop the sweep early and mark the report degraded
        timeout: Option<Duration>,
    },
}

impl Strategy {
    pub fn perturbation() -> Self {
        Strategy::Perturbation {
            pct: DEFAULT_PCT,
            timeout: None,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Analytic => StrategyKind::Analytic,
            Strategy::Perturbation { .. } => StrategyKind::Perturbation,
        }
    }
}

impl Solver {
    /// Solve `model` and attach the sensitivity figures of `strategy`.
    ///
    /// Infeasible and unbounded models are reported as errors without any
    /// partial solution.
    pub fn solve_and_analyze(
        &self,
        model: &Model,
        strategy: Strategy,
    ) -> Result<SensitivityReport, SolveError> {
        let (solution, basis) = self.solve_with_basis(model);
        if let Some(err) = SolveError::from_solution(&solution) {
            return Err(err);
        }

        let report = match strategy {
            Strategy::Analytic => {
                let basis = basis.ok_or(SolveError::BasisMismatch)?;
                let (variables, constraints) = ranging::analyze(model, &basis)?;
                SensitivityReport {
                    degraded: solution.degraded,
                    solution,
                    variables,
                    constraints,
                    strategy: StrategyKind::Analytic,
                }
            }
            Strategy::Perturbation { pct, timeout } => {
                let mut analyzer = PerturbationAnalyzer::new(*self).with_pct(pct);
                if let Some(timeout) = timeout {
                    analyzer = analyzer.with_timeout(timeout);
                }
                let result = analyzer.analyze(model, &solution)?;
                SensitivityReport {
                    degraded: solution.degraded || result.degraded || result.timed_out,
                    solution,
                    variables: result.variables,
                    constraints: result.constraints,
                    strategy: StrategyKind::Perturbation,
                }
            }
        };

        info!(
            "{:?} sensitivity report ready (degraded={})",
            report.strategy, report.degraded
        );
        Ok(report)
    }
}
