use lpsens_solver::{Constraint, Model, ModelError, Relation, Sense};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inbound sensitivity-analysis request as posted by the web client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRequest {
    #[serde(rename = "tipo")]
    pub kind: ObjectiveKind,
    #[serde(rename = "coef_objetivo")]
    pub objective: Vec<f64>,
    pub lhs: Vec<Vec<f64>>,
    pub rhs: Vec<f64>,
    /// Per-row operator (`<=`, `>=`, `=`); every row is `<=` when absent
    #[serde(rename = "operadores", default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveKind {
    Max,
    Min,
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid request body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rhs has {rhs} entries but lhs has {lhs} rows")]
    RhsLength { lhs: usize, rhs: usize },
    #[error("operadores has {found} entries but there are {expected} constraints")]
    OperatorCount { expected: usize, found: usize },
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<ObjectiveKind> for Sense {
    fn from(kind: ObjectiveKind) -> Self {
        match kind {
            ObjectiveKind::Max => Sense::Max,
            ObjectiveKind::Min => Sense::Min,
        }
    }
}

fn parse_operator(op: &str) -> Result<Relation, RequestError> {
    match op.trim() {
        "<=" | "≤" => Ok(Relation::Le),
        ">=" | "≥" => Ok(Relation::Ge),
        "=" | "==" => Ok(Relation::Eq),
        other => Err(RequestError::UnknownOperator(other.to_string())),
    }
}

impl SensitivityRequest {
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Validate every dimension and build the model; no numeric work happens on failure.
    pub fn to_model(&self) -> Result<Model, RequestError> {
        if self.rhs.len() != self.lhs.len() {
            return Err(RequestError::RhsLength {
                lhs: self.lhs.len(),
                rhs: self.rhs.len(),
            });
        }

        let relations = match &self.operators {
            None => vec![Relation::Le; self.lhs.len()],
            Some(ops) => {
                if ops.len() != self.lhs.len() {
                    return Err(RequestError::OperatorCount {
                        expected: self.lhs.len(),
                        found: ops.len(),
                    });
                }
                ops.iter()
                    .map(|op| parse_operator(op))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let constraints = self
            .lhs
            .iter()
            .zip(&self.rhs)
            .zip(relations)
            .map(|((row, &rhs), relation)| Constraint::new(row.clone(), relation, rhs))
            .collect();

        Ok(Model::new(self.kind.into(), self.objective.clone(), constraints)?)
    }
}
