//! Dual values and ranging read off the terminal simplex tableau.
//!
//! Nothing here re-solves: reduced costs and shadow prices come from the
//! objective row, coefficient ranges from ratio tests along basic rows, and
//! RHS ranges from the inverse-basis columns.

use log::debug;

use crate::error::SolveError;
use crate::model::{Model, Sense};
use crate::simplex::BasisState;
use crate::solution::{
    Bound, ConstraintMeasure, ConstraintSensitivity, Interval, VariableMeasure, VariableSensitivity,
};

/// Derive reduced costs, shadow prices, and coefficient/RHS ranges from an optimal basis.
pub fn analyze(
    model: &Model,
    basis: &BasisState,
) -> Result<(Vec<VariableSensitivity>, Vec<ConstraintSensitivity>), SolveError> {
    if basis.n_vars != model.num_variables() || basis.num_rows() != model.num_constraints() {
        return Err(SolveError::BasisMismatch);
    }

    let basic_rows = basis.basic_rows();
    let variables = (0..model.num_variables())
        .map(|j| variable_sensitivity(model, basis, &basic_rows, j))
        .collect();
    let constraints = (0..model.num_constraints())
        .map(|i| constraint_sensitivity(model, basis, i))
        .collect();

    debug!(
        "ranging done for {} variables and {} constraints",
        model.num_variables(),
        model.num_constraints()
    );
    Ok((variables, constraints))
}

fn variable_sensitivity(
    model: &Model,
    basis: &BasisState,
    basic_rows: &[Option<usize>],
    j: usize,
) -> VariableSensitivity {
    let tol = basis.tolerance;
    let sign = model.sense().sign();
    let coefficient = model.objective()[j];
    let obj_row = basis.obj_row();
    let rhs_col = basis.rhs_col();

    let (current_value, reduced_cost, coefficient_range) = match basic_rows[j] {
        None => {
            let d = basis.data[obj_row][j];
            let reduced_cost = snap(sign * d, tol);
            // The basis stays optimal while the internal reduced cost is non-negative
            let range = match model.sense() {
                Sense::Min => Interval {
                    lower: Bound::Finite(coefficient - reduced_cost),
                    upper: Bound::PosInfinity,
                },
                Sense::Max => Interval {
                    lower: Bound::NegInfinity,
                    upper: Bound::Finite(coefficient - reduced_cost),
                },
            };
            (0.0, reduced_cost, range)
        }
        Some(row) => {
            // Internal cost may move by delta while d_k - delta * a_rk >= 0 for every nonbasic k
            let mut increase = f64::INFINITY;
            let mut decrease = f64::NEG_INFINITY;
            for k in 0..basis.artificial_start() {
                if basic_rows[k].is_some() {
                    continue;
                }
                let a = basis.data[row][k];
                let d = basis.data[obj_row][k].max(0.0);
                if a > tol {
                    increase = increase.min(d / a);
                } else if a < -tol {
                    decrease = decrease.max(d / a);
                }
            }

            let (low, high) = match model.sense() {
                Sense::Min => (decrease, increase),
                Sense::Max => (-increase, -decrease),
            };
            let range = Interval {
                lower: offset(coefficient, low),
                upper: offset(coefficient, high),
            };
            (snap(basis.data[row][rhs_col], tol), 0.0, range)
        }
    };

    VariableSensitivity {
        variable_index: j,
        current_value,
        coefficient,
        measure: VariableMeasure::Ranging {
            reduced_cost,
            coefficient_range,
        },
    }
}

fn constraint_sensitivity(model: &Model, basis: &BasisState, i: usize) -> ConstraintSensitivity {
    let tol = basis.tolerance;
    let obj_row = basis.obj_row();
    let rhs_col = basis.rhs_col();
    let identity = basis.identity_cols[i];
    let row_sign = basis.row_signs[i];
    let rhs = model.constraints()[i].rhs;

    // The identity column has zero cost, so its reduced cost is minus the dual
    let dual = -basis.data[obj_row][identity] * row_sign;
    let shadow_price = snap(model.sense().sign() * dual, tol);

    // x_B(rhs + delta) = x_B + delta * row_sign * B^-1 e_i must stay non-negative
    let art_start = basis.artificial_start();
    let mut low = f64::NEG_INFINITY;
    let mut high = f64::INFINITY;
    for (r, &basic) in basis.basic_vars.iter().enumerate() {
        let rate = row_sign * basis.data[r][identity];
        if rate.abs() <= tol {
            continue;
        }
        if basic >= art_start {
            // Artificial in a redundant row must stay at zero
            low = low.max(0.0);
            high = high.min(0.0);
            continue;
        }
        let value = basis.data[r][rhs_col].max(0.0);
        if rate > 0.0 {
            low = low.max(-value / rate);
        } else {
            high = high.min(-value / rate);
        }
    }

    ConstraintSensitivity {
        constraint_index: i,
        current_rhs: rhs,
        shadow_price: Bound::Finite(shadow_price),
        measure: ConstraintMeasure::Ranging {
            rhs_range: Interval {
                lower: offset(rhs, low),
                upper: offset(rhs, high),
            },
        },
    }
}

fn offset(base: f64, delta: f64) -> Bound {
    if delta == f64::INFINITY {
        Bound::PosInfinity
    } else if delta == f64::NEG_INFINITY {
        Bound::NegInfinity
    } else {
        Bound::Finite(base + delta)
    }
}

fn snap(value: f64, tol: f64) -> f64 {
    if value.abs() <= tol { 0.0 } else { value }
}
