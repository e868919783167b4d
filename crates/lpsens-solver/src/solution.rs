/// The result of solving an LP model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (empty unless optimal)
    pub values: Vec<f64>,
    /// Optimal objective value in the model's own sense
    pub objective_value: f64,
    /// Set when the pivot budget ran out and the result is best-effort
    pub degraded: bool,
    /// Number of pivots performed across both phases
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
}

impl Solution {
    pub fn infeasible(iterations: usize, degraded: bool) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::NAN,
            degraded,
            iterations,
        }
    }

    pub fn unbounded(iterations: usize, degraded: bool) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::NAN,
            degraded,
            iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

/// One end of a sensitivity interval, or a value that could not be computed.
///
/// Unconstrained ends are reported with the explicit infinity variants rather
/// than a large finite number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    NegInfinity,
    Finite(f64),
    PosInfinity,
    /// A perturbed re-solve was not optimal, or the sweep ran out of time
    Unavailable,
}

impl Bound {
    pub fn value(self) -> Option<f64> {
        match self {
            Bound::Finite(v) => Some(v),
            _ => None,
        }
    }

    /// Applies `f` to a finite value; sentinels pass through unchanged.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Bound::Finite(v) => Bound::Finite(f(v)),
            other => other,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Bound {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bound::NegInfinity => serializer.serialize_str("-Infinity"),
            Bound::Finite(v) => serializer.serialize_f64(*v),
            Bound::PosInfinity => serializer.serialize_str("Infinity"),
            Bound::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Closed interval over which a parameter may move without changing the basis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Interval {
    pub lower: Bound,
    pub upper: Bound,
}

impl Interval {
    pub fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Bound::Finite(l) => value >= l,
            Bound::NegInfinity => true,
            _ => false,
        };
        let below = match self.upper {
            Bound::Finite(u) => value <= u,
            Bound::PosInfinity => true,
            _ => false,
        };
        above && below
    }
}

/// Objective values observed after scaling one parameter by `1 - pct` and `1 + pct`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Perturbed {
    pub objective_down: Bound,
    pub objective_up: Bound,
    /// Largest `|z - z*| / |z*|` over the available sides (a fraction, not a percentage)
    pub relative_change: Bound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VariableMeasure {
    Ranging {
        /// Reduced cost in the model's own sense (`c_j - z_j`)
        reduced_cost: f64,
        /// Objective coefficient range keeping the basis optimal
        coefficient_range: Interval,
    },
    Perturbation(Perturbed),
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConstraintMeasure {
    Ranging {
        /// RHS range keeping the basis feasible
        rhs_range: Interval,
    },
    Perturbation(Perturbed),
}

/// Sensitivity of the optimum to one objective coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariableSensitivity {
    pub variable_index: usize,
    pub current_value: f64,
    pub coefficient: f64,
    pub measure: VariableMeasure,
}

/// Sensitivity of the optimum to one right-hand side
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConstraintSensitivity {
    pub constraint_index: usize,
    pub current_rhs: f64,
    /// Change of the optimal objective per unit increase of the RHS
    pub shadow_price: Bound,
    pub measure: ConstraintMeasure,
}

impl VariableSensitivity {
    pub fn reduced_cost(&self) -> Option<f64> {
        match self.measure {
            VariableMeasure::Ranging { reduced_cost, .. } => Some(reduced_cost),
            VariableMeasure::Perturbation(_) => None,
        }
    }

    pub fn coefficient_range(&self) -> Option<Interval> {
        match self.measure {
            VariableMeasure::Ranging {
                coefficient_range, ..
            } => Some(coefficient_range),
            VariableMeasure::Perturbation(_) => None,
        }
    }
}

impl ConstraintSensitivity {
    pub fn rhs_range(&self) -> Option<Interval> {
        match self.measure {
            ConstraintMeasure::Ranging { rhs_range } => Some(rhs_range),
            ConstraintMeasure::Perturbation(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StrategyKind {
    Analytic,
    Perturbation,
}

/// Optimal solution together with the sensitivity figures of one strategy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SensitivityReport {
    pub solution: Solution,
    pub variables: Vec<VariableSensitivity>,
    pub constraints: Vec<ConstraintSensitivity>,
    pub strategy: StrategyKind,
    /// Set when the solve was degraded or the perturbation sweep stopped early
    pub degraded: bool,
}
