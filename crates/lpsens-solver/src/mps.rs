//! MPS export for handing a model to an external solver.
//!
//! Rows are named `R1..Rm`, the objective row `OBJETIVO`, the RHS vector
//! `RHS1`, and variables `x1..xn`. Fields are column-aligned but separated by
//! whitespace, so both fixed and free MPS readers accept the output.

use std::fmt::Write;

use crate::model::{Model, Relation, Sense};

pub const OBJECTIVE_ROW: &str = "OBJETIVO";
pub const RHS_VECTOR: &str = "RHS1";
pub const BOUND_VECTOR: &str = "BND1";

pub fn row_name(index: usize) -> String {
    format!("R{}", index + 1)
}

pub fn variable_name(index: usize) -> String {
    format!("x{}", index + 1)
}

/// Render `model` as MPS text.
///
/// MPS has no standard way to state the direction; maximization models get an
/// `OBJSENSE MAX` section, which mainstream readers understand.
pub fn to_mps(model: &Model, name: &str) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "NAME          {}", name);
    if model.sense() == Sense::Max {
        let _ = writeln!(out, "OBJSENSE");
        let _ = writeln!(out, "    MAX");
    }

    let _ = writeln!(out, "ROWS");
    let _ = writeln!(out, " N  {}", OBJECTIVE_ROW);
    for (i, c) in model.constraints().iter().enumerate() {
        let kind = match c.relation {
            Relation::Le => "L",
            Relation::Ge => "G",
            Relation::Eq => "E",
        };
        let _ = writeln!(out, " {}  {}", kind, row_name(i));
    }

    let _ = writeln!(out, "COLUMNS");
    for (j, &cost) in model.objective().iter().enumerate() {
        let column = variable_name(j);
        let mut written = false;
        if cost != 0.0 {
            entry(&mut out, &column, OBJECTIVE_ROW, cost);
            written = true;
        }
        for (i, c) in model.constraints().iter().enumerate() {
            let coef = c.coefficients[j];
            if coef != 0.0 {
                entry(&mut out, &column, &row_name(i), coef);
                written = true;
            }
        }
        // Every column must appear once or the BOUNDS entry refers to nothing
        if !written {
            entry(&mut out, &column, OBJECTIVE_ROW, 0.0);
        }
    }

    let _ = writeln!(out, "RHS");
    for (i, c) in model.constraints().iter().enumerate() {
        if c.rhs != 0.0 {
            entry(&mut out, RHS_VECTOR, &row_name(i), c.rhs);
        }
    }

    let _ = writeln!(out, "BOUNDS");
    for j in 0..model.num_variables() {
        let _ = writeln!(out, " LO {:<8}  {:<8}  {}", BOUND_VECTOR, variable_name(j), 0);
    }

    let _ = writeln!(out, "ENDATA");
    out
}

fn entry(out: &mut String, column: &str, row: &str, value: f64) {
    let _ = writeln!(out, "    {:<8}  {:<8}  {}", column, row, value);
}
