use thiserror::Error;

/// A validated linear programming model.
///
/// All variables carry an implicit `x >= 0` bound. Instances are only built
/// through [`Model::new`], which rejects dimension mismatches before any
/// numeric work is done.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Model {
    sense: Sense,
    objective: Vec<f64>,
    constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Sense {
    /// Maximize the objective
    Max,
    /// Minimize the objective
    Min,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Constraint {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub relation: Relation,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Relation {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Objective must have at least one coefficient")]
    EmptyObjective,
    #[error("Constraint {constraint} has {found} coefficients, expected {expected}")]
    DimensionMismatch {
        constraint: usize,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
    #[error("Index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

impl Sense {
    /// Factor that maps the caller's objective onto the internal minimization.
    pub(crate) fn sign(self) -> f64 {
        match self {
            Sense::Max => -1.0,
            Sense::Min => 1.0,
        }
    }
}

impl Relation {
    /// The relation obtained after multiplying both sides by -1.
    pub fn flipped(self) -> Self {
        match self {
            Relation::Le => Relation::Ge,
            Relation::Ge => Relation::Le,
            Relation::Eq => Relation::Eq,
        }
    }
}

impl Constraint {
    pub fn new(coefficients: Vec<f64>, relation: Relation, rhs: f64) -> Self {
        Self {
            coefficients,
            relation,
            rhs,
        }
    }

    /// Left-hand side evaluated at `values`.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(a, x)| a * x)
            .sum()
    }

    /// Whether `values` satisfy this constraint within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        match self.relation {
            Relation::Le => lhs <= self.rhs + tolerance,
            Relation::Ge => lhs >= self.rhs - tolerance,
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

impl Model {
    pub fn new(
        sense: Sense,
        objective: Vec<f64>,
        constraints: Vec<Constraint>,
    ) -> Result<Self, ModelError> {
        if objective.is_empty() {
            return Err(ModelError::EmptyObjective);
        }
        if objective.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::NonFinite("objective".to_string()));
        }

        let n = objective.len();
        for (i, c) in constraints.iter().enumerate() {
            if c.coefficients.len() != n {
                return Err(ModelError::DimensionMismatch {
                    constraint: i,
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if c.coefficients.iter().any(|a| !a.is_finite()) || !c.rhs.is_finite() {
                return Err(ModelError::NonFinite(format!("constraint {}", i)));
            }
        }

        Ok(Self {
            sense,
            objective,
            constraints,
        })
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of `values` in the model's own sense.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective.iter().zip(values).map(|(c, x)| c * x).sum()
    }

    /// Copy of this model with objective coefficient `index` replaced.
    pub fn with_objective_coefficient(&self, index: usize, value: f64) -> Result<Self, ModelError> {
        if index >= self.objective.len() {
            return Err(ModelError::IndexOutOfRange {
                what: "objective",
                index,
                len: self.objective.len(),
            });
        }
        if !value.is_finite() {
            return Err(ModelError::NonFinite("objective".to_string()));
        }
        let mut model = self.clone();
        model.objective[index] = value;
        Ok(model)
    }

    /// Copy of this model with the right-hand side of constraint `index` replaced.
    pub fn with_rhs(&self, index: usize, value: f64) -> Result<Self, ModelError> {
        if index >= self.constraints.len() {
            return Err(ModelError::IndexOutOfRange {
                what: "constraints",
                index,
                len: self.constraints.len(),
            });
        }
        if !value.is_finite() {
            return Err(ModelError::NonFinite(format!("constraint {}", index)));
        }
        let mut model = self.clone();
        model.constraints[index].rhs = value;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_dimension_mismatch() {
        let err = Model::new(
            Sense::Max,
            vec![3.0, 5.0],
            vec![
                Constraint::new(vec![1.0, 0.0], Relation::Le, 4.0),
                Constraint::new(vec![3.0], Relation::Le, 18.0),
            ],
        )
        .unwrap_err();

        assert_eq!(
            err,
            ModelError::DimensionMismatch {
                constraint: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rejects_empty_objective_and_nan() {
        assert_eq!(
            Model::new(Sense::Min, vec![], vec![]).unwrap_err(),
            ModelError::EmptyObjective
        );
        assert!(matches!(
            Model::new(
                Sense::Min,
                vec![1.0],
                vec![Constraint::new(vec![f64::NAN], Relation::Ge, 1.0)]
            ),
            Err(ModelError::NonFinite(_))
        ));
    }

    #[test]
    fn test_constraints_may_be_empty() {
        let model = Model::new(Sense::Max, vec![1.0], vec![]).unwrap();
        assert_eq!(model.num_variables(), 1);
        assert_eq!(model.num_constraints(), 0);
    }

    #[test]
    fn test_copy_with_changes_leaves_original_untouched() {
        let model = Model::new(
            Sense::Max,
            vec![3.0, 5.0],
            vec![Constraint::new(vec![1.0, 1.0], Relation::Le, 4.0)],
        )
        .unwrap();

        let changed = model.with_objective_coefficient(1, 6.0).unwrap();
        assert_eq!(changed.objective(), &[3.0, 6.0]);
        assert_eq!(model.objective(), &[3.0, 5.0]);

        let changed = model.with_rhs(0, 5.0).unwrap();
        assert_eq!(changed.constraints()[0].rhs, 5.0);
        assert_eq!(model.constraints()[0].rhs, 4.0);

        assert!(model.with_rhs(3, 1.0).is_err());
    }

    #[test]
    fn test_activity_and_satisfaction() {
        let c = Constraint::new(vec![3.0, 2.0], Relation::Le, 18.0);
        assert_eq!(c.activity(&[2.0, 6.0]), 18.0);
        assert!(c.is_satisfied(&[2.0, 6.0], 1e-9));
        assert!(!c.is_satisfied(&[3.0, 6.0], 1e-9));
        assert_eq!(Relation::Ge.flipped(), Relation::Le);
    }
}
