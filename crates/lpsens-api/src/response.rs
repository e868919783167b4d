//! Response shaping for the sensitivity endpoint.
//!
//! Numbers are rounded to four decimals here and nowhere else.

use log::info;
use lpsens_solver::{
    Bound, ConstraintMeasure, Interval, SensitivityReport, SolveError, Solver, Strategy,
    VariableMeasure, mps,
};
use serde::Serialize;
use serde::ser::SerializeMap;

use crate::request::{RequestError, SensitivityRequest};

pub const NO_OPTIMUM_MESSAGE: &str = "No se encontró solución óptima";
pub const BUDGET_EXHAUSTED_MESSAGE: &str =
    "No se pudo determinar la factibilidad dentro del límite de iteraciones";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensitivityResponse {
    Optimal(OptimalResponse),
    Failure(FailureResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimalResponse {
    pub solucion: Assignment,
    pub z_optimo: f64,
    #[serde(rename = "sensibilidadVariables")]
    pub variables: Vec<VariableEntry>,
    #[serde(rename = "sensibilidadRestricciones")]
    pub constraints: Vec<ConstraintEntry>,
    #[serde(rename = "degradado", skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Variable values keyed `x1..xn`, serialized in index order
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment(pub Vec<(String, f64)>);

impl Serialize for Assignment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableEntry {
    pub variable: String,
    pub valor_actual: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduced_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_coefficient_range: Option<Interval>,
    /// Percentage change of the optimum under the perturbation sweep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variacion_aproximada: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintEntry {
    pub restriccion: String,
    pub valor_actual: f64,
    pub valor_sombra: Bound,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs_range: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variacion_aproximada: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureResponse {
    pub mensaje: String,
    pub estado: FailureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Infactible,
    NoAcotado,
    /// Pivot budget ran out before feasibility was decided
    Degradado,
    ModeloInvalido,
    ParametroInvalido,
}

impl SensitivityResponse {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SensitivityResponse::Optimal(_))
    }
}

impl From<RequestError> for FailureResponse {
    fn from(err: RequestError) -> Self {
        FailureResponse {
            mensaje: format!("Modelo mal formado: {}", err),
            estado: FailureKind::ModeloInvalido,
        }
    }
}

impl From<SolveError> for FailureResponse {
    fn from(err: SolveError) -> Self {
        let (mensaje, estado) = match err {
            SolveError::Infeasible => (NO_OPTIMUM_MESSAGE.to_string(), FailureKind::Infactible),
            SolveError::Unbounded => (NO_OPTIMUM_MESSAGE.to_string(), FailureKind::NoAcotado),
            SolveError::NumericDegeneracy => (BUDGET_EXHAUSTED_MESSAGE.to_string(), FailureKind::Degradado),
            SolveError::MalformedModel(e) => (format!("Modelo mal formado: {}", e), FailureKind::ModeloInvalido),
            other => (other.to_string(), FailureKind::ParametroInvalido),
        };
        FailureResponse { mensaje, estado }
    }
}

pub fn round4(value: f64) -> f64 {
    let rounded = (value * 1e4).round() / 1e4;
    // Avoid printing -0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn round_bound(bound: Bound) -> Bound {
    bound.map(round4)
}

fn round_interval(interval: Interval) -> Interval {
    Interval {
        lower: round_bound(interval.lower),
        upper: round_bound(interval.upper),
    }
}

fn as_percentage(bound: Bound) -> Bound {
    bound.map(|fraction| round4(fraction * 100.0))
}

impl From<&SensitivityReport> for OptimalResponse {
    fn from(report: &SensitivityReport) -> Self {
        let solucion = Assignment(
            report
                .solution
                .values
                .iter()
                .enumerate()
                .map(|(j, &v)| (mps::variable_name(j), round4(v)))
                .collect(),
        );

        let variables = report
            .variables
            .iter()
            .map(|v| {
                let mut entry = VariableEntry {
                    variable: mps::variable_name(v.variable_index),
                    valor_actual: round4(v.current_value),
                    reduced_cost: None,
                    objective_coefficient_range: None,
                    variacion_aproximada: None,
                };
                match v.measure {
                    VariableMeasure::Ranging {
                        reduced_cost,
                        coefficient_range,
                    } => {
                        entry.reduced_cost = Some(round4(reduced_cost));
                        entry.objective_coefficient_range = Some(round_interval(coefficient_range));
                    }
                    VariableMeasure::Perturbation(p) => {
                        entry.variacion_aproximada = Some(as_percentage(p.relative_change));
                    }
                }
                entry
            })
            .collect();

        let constraints = report
            .constraints
            .iter()
            .map(|c| {
                let mut entry = ConstraintEntry {
                    restriccion: mps::row_name(c.constraint_index),
                    valor_actual: round4(c.current_rhs),
                    valor_sombra: round_bound(c.shadow_price),
                    rhs_range: None,
                    variacion_aproximada: None,
                };
                match c.measure {
                    ConstraintMeasure::Ranging { rhs_range } => {
                        entry.rhs_range = Some(round_interval(rhs_range));
                    }
                    ConstraintMeasure::Perturbation(p) => {
                        entry.variacion_aproximada = Some(as_percentage(p.relative_change));
                    }
                }
                entry
            })
            .collect();

        OptimalResponse {
            solucion,
            z_optimo: round4(report.solution.objective_value),
            variables,
            constraints,
            degraded: report.degraded,
        }
    }
}

/// Validate, solve, analyze, and shape one request.
pub fn respond(request: &SensitivityRequest, solver: &Solver, strategy: Strategy) -> SensitivityResponse {
    let model = match request.to_model() {
        Ok(model) => model,
        Err(err) => return SensitivityResponse::Failure(err.into()),
    };

    match solver.solve_and_analyze(&model, strategy) {
        Ok(report) => SensitivityResponse::Optimal((&report).into()),
        Err(err) => {
            info!("request rejected: {}", err);
            SensitivityResponse::Failure(err.into())
        }
    }
}

/// Same as [`respond`] for a raw JSON body.
pub fn respond_json(body: &str, solver: &Solver, strategy: Strategy) -> SensitivityResponse {
    match SensitivityRequest::from_json(body) {
        Ok(request) => respond(&request, solver, strategy),
        Err(err) => SensitivityResponse::Failure(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WYNDOR: &str =
        r#"{"tipo": "max", "coef_objetivo": [3, 5], "lhs": [[1, 0], [0, 2], [3, 2]], "rhs": [4, 12, 18]}"#;

    #[test]
    fn test_analytic_response_shape() {
        let response = respond_json(WYNDOR, &Solver::new(), Strategy::Analytic);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["solucion"], json!({"x1": 2.0, "x2": 6.0}));
        assert_eq!(value["z_optimo"], json!(36.0));
        assert!(value.get("degradado").is_none());

        let x2 = &value["sensibilidadVariables"][1];
        assert_eq!(x2["variable"], json!("x2"));
        assert_eq!(x2["reducedCost"], json!(0.0));
        assert_eq!(x2["objectiveCoefficientRange"], json!({"lower": 2.0, "upper": "Infinity"}));
        assert!(x2.get("variacionAproximada").is_none());

        let r2 = &value["sensibilidadRestricciones"][1];
        assert_eq!(r2["restriccion"], json!("R2"));
        assert_eq!(r2["valorActual"], json!(12.0));
        assert_eq!(r2["valorSombra"], json!(1.5));
        assert_eq!(r2["rhsRange"], json!({"lower": 6.0, "upper": 18.0}));
    }

    #[test]
    fn test_perturbation_response_reports_percentages() {
        let response = respond_json(WYNDOR, &Solver::new(), Strategy::perturbation());
        let value = serde_json::to_value(&response).unwrap();

        // Scaling c1 = 3 by 10% moves z by 0.6 out of 36
        let x1 = &value["sensibilidadVariables"][0];
        assert_eq!(x1["variacionAproximada"], json!(1.6667));
        assert!(x1.get("reducedCost").is_none());

        let r1 = &value["sensibilidadRestricciones"][0];
        assert_eq!(r1["variacionAproximada"], json!(0.0));
        assert_eq!(r1["valorSombra"], json!(0.0));
    }

    #[test]
    fn test_non_optimal_message() {
        let infeasible = r#"{"tipo": "max", "coef_objetivo": [1], "lhs": [[1]], "rhs": [-1]}"#;
        let unbounded = r#"{"tipo": "max", "coef_objetivo": [1], "lhs": [], "rhs": []}"#;

        let value = serde_json::to_value(respond_json(infeasible, &Solver::new(), Strategy::Analytic)).unwrap();
        assert_eq!(value, json!({"mensaje": NO_OPTIMUM_MESSAGE, "estado": "infactible"}));

        let value = serde_json::to_value(respond_json(unbounded, &Solver::new(), Strategy::Analytic)).unwrap();
        assert_eq!(value, json!({"mensaje": NO_OPTIMUM_MESSAGE, "estado": "no_acotado"}));
    }

    #[test]
    fn test_exhausted_budget_is_not_infeasible() {
        let body = r#"{"tipo": "min", "coef_objetivo": [2, 3], "lhs": [[1, 1], [1, 3]], "rhs": [4, 6], "operadores": [">=", ">="]}"#;

        let tight = Solver::new().with_max_iterations(1);
        let value = serde_json::to_value(respond_json(body, &tight, Strategy::Analytic)).unwrap();
        assert_eq!(value, json!({"mensaje": BUDGET_EXHAUSTED_MESSAGE, "estado": "degradado"}));

        let value = serde_json::to_value(respond_json(body, &Solver::new(), Strategy::Analytic)).unwrap();
        assert_eq!(value["z_optimo"], json!(9.0));
    }

    #[test]
    fn test_malformed_request_is_rejected_before_solving() {
        let body = r#"{"tipo": "max", "coef_objetivo": [1, 2], "lhs": [[1, 2]], "rhs": [1, 2]}"#;

        let response = respond_json(body, &Solver::new(), Strategy::Analytic);

        match response {
            SensitivityResponse::Failure(f) => {
                assert_eq!(f.estado, FailureKind::ModeloInvalido);
                assert!(f.mensaje.contains("rhs has 2 entries"), "{}", f.mensaje);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_keeps_index_order() {
        let assignment = Assignment((1..=11).map(|i| (format!("x{}", i), 0.0)).collect());
        let text = serde_json::to_string(&assignment).unwrap();
        assert!(text.find("\"x2\"").unwrap() < text.find("\"x10\"").unwrap());
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(1.23456), 1.2346);
        assert_eq!(round4(-0.00001), 0.0);
        assert!(round4(-0.00001).is_sign_positive());
    }
}
