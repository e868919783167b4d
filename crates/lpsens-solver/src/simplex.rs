use log::{debug, info, warn};

use crate::model::{Model, Relation};
use crate::solution::{Solution, SolutionStatus};

/// Two-phase dense simplex solver.
///
/// The solver holds configuration only, so one instance can be shared by any
/// number of threads; every solve builds and owns its own [`BasisState`].
#[derive(Debug, Clone, Copy)]
pub struct Solver {
    /// Maximum pivots per phase before giving up with a degraded result
    max_iterations: usize,
    /// Tolerance for floating point comparisons against zero
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

/// Terminal simplex tableau of an optimal solve.
///
/// Rows `0..m` hold the constraint rows in standard form; the last row holds
/// the reduced costs of the internal minimization with `-z` in the RHS cell.
/// Columns are laid out as structural variables, then one slack or surplus
/// column per inequality row, then one artificial column per `>=`/`=` row,
/// then the RHS.
#[derive(Debug, Clone)]
pub struct BasisState {
    pub(crate) data: Vec<Vec<f64>>,
    pub(crate) basic_vars: Vec<usize>,
    pub(crate) n_vars: usize,
    pub(crate) n_slack: usize,
    pub(crate) n_artificial: usize,
    /// Column that formed the unit vector of each row in the initial basis
    pub(crate) identity_cols: Vec<usize>,
    /// -1.0 for rows negated to make their RHS non-negative
    pub(crate) row_signs: Vec<f64>,
    pub(crate) tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PivotRule {
    /// Most negative reduced cost, lowest row on ratio ties
    Dantzig,
    /// Lowest index entering column, lowest basic index on ratio ties
    Bland,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimplexResult {
    Optimal,
    Unbounded,
    /// Pivot budget exhausted
    Exhausted,
}

struct PhaseOutcome {
    result: SimplexResult,
    iterations: usize,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the model using the two-phase simplex method
    pub fn solve(&self, model: &Model) -> Solution {
        self.solve_with_basis(model).0
    }

    /// Solve the model and, when optimal, hand back the terminal basis for ranging.
    pub fn solve_with_basis(&self, model: &Model) -> (Solution, Option<BasisState>) {
        let mut state = BasisState::from_model(model, self.tolerance);
        let mut iterations = 0;
        let mut degraded = false;

        debug!(
            "built tableau: num_vars={} num_slack={} num_artificial={} num_constraints={}",
            state.n_vars,
            state.n_slack,
            state.n_artificial,
            state.num_rows(),
        );

        // Phase 1: find an initial basic feasible solution
        if state.n_artificial > 0 {
            let outcome = self.phase1(&mut state);
            iterations += outcome.iterations;
            match outcome.result {
                SimplexResult::Optimal => {}
                SimplexResult::Exhausted => degraded = true,
                SimplexResult::Unbounded => {
                    // The auxiliary objective is bounded below by zero
                    warn!("phase 1 reported an unbounded ray; treating model as infeasible");
                    return (Solution::infeasible(iterations, true), None);
                }
            }

            let infeasibility = state.artificial_level();
            if infeasibility > self.tolerance {
                info!(
                    "model infeasible: artificial sum {:e} after {} pivots",
                    infeasibility, iterations
                );
                return (Solution::infeasible(iterations, degraded), None);
            }
            iterations += self.drive_out_artificials(&mut state);
        }

        // Phase 2: optimize the real objective from the feasible basis
        state.load_objective(model);
        let outcome = self.iterate(&mut state, "phase 2");
        iterations += outcome.iterations;
        match outcome.result {
            SimplexResult::Optimal => {}
            SimplexResult::Exhausted => degraded = true,
            SimplexResult::Unbounded => {
                info!("model unbounded after {} pivots", iterations);
                return (Solution::unbounded(iterations, degraded), None);
            }
        }

        let solution = self.extract_solution(&state, model, iterations, degraded);
        info!(
            "solved: objective={} pivots={} degraded={}",
            solution.objective_value, solution.iterations, solution.degraded
        );
        (solution, Some(state))
    }

    fn phase1(&self, state: &mut BasisState) -> PhaseOutcome {
        // Auxiliary objective: minimize the sum of artificial variables
        let obj_row = state.obj_row();
        let n_cols = state.n_cols();
        let art_start = state.artificial_start();

        for j in 0..n_cols {
            state.data[obj_row][j] = 0.0;
        }
        for j in art_start..(art_start + state.n_artificial) {
            state.data[obj_row][j] = 1.0;
        }

        // Price out the basic artificials so their reduced costs are zero
        for i in 0..state.num_rows() {
            if state.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    state.data[obj_row][j] -= state.data[i][j];
                }
            }
        }

        self.iterate(state, "phase 1")
    }

    /// Pivots basic artificials sitting at zero out of the basis.
    ///
    /// Rows without any nonzero structural entry are redundant and keep their
    /// artificial, which then stays at zero for the rest of the solve.
    fn drive_out_artificials(&self, state: &mut BasisState) -> usize {
        let art_start = state.artificial_start();
        let rhs_col = state.rhs_col();
        let mut pivots = 0;

        for row in 0..state.num_rows() {
            if state.basic_vars[row] < art_start {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for j in 0..art_start {
                let magnitude = state.data[row][j].abs();
                if magnitude > self.tolerance && best.is_none_or(|(_, m)| magnitude > m) {
                    best = Some((j, magnitude));
                }
            }
            match best {
                Some((col, _)) => {
                    state.data[row][rhs_col] = 0.0;
                    state.pivot(row, col);
                    pivots += 1;
                }
                None => debug!("row {} is redundant; artificial stays basic at zero", row),
            }
        }
        pivots
    }

    fn iterate(&self, state: &mut BasisState, phase: &str) -> PhaseOutcome {
        let stall_limit = (4 * (state.n_vars + state.num_rows())).max(1);
        let mut rule = PivotRule::Dantzig;
        let mut stalled = 0;
        let mut iterations = 0;

        loop {
            if iterations >= self.max_iterations {
                warn!(
                    "{}: pivot budget of {} exhausted, returning best-effort basis",
                    phase, self.max_iterations
                );
                return PhaseOutcome {
                    result: SimplexResult::Exhausted,
                    iterations,
                };
            }

            let Some(pivot_col) = self.find_pivot_column(state, rule) else {
                debug!("{}: optimal after {} pivots", phase, iterations);
                return PhaseOutcome {
                    result: SimplexResult::Optimal,
                    iterations,
                };
            };
            let Some(pivot_row) = self.find_pivot_row(state, pivot_col, rule) else {
                return PhaseOutcome {
                    result: SimplexResult::Unbounded,
                    iterations,
                };
            };

            let before = state.objective_cell();
            state.pivot(pivot_row, pivot_col);
            iterations += 1;

            if (state.objective_cell() - before).abs() <= self.tolerance {
                stalled += 1;
                if rule == PivotRule::Dantzig && stalled >= stall_limit {
                    debug!(
                        "{}: {} degenerate pivots in a row, switching to Bland's rule",
                        phase, stalled
                    );
                    rule = PivotRule::Bland;
                }
            } else {
                stalled = 0;
            }
        }
    }

    fn find_pivot_column(&self, state: &BasisState, rule: PivotRule) -> Option<usize> {
        let obj_row = state.obj_row();
        // Artificial columns never enter
        let candidates = 0..state.artificial_start();

        match rule {
            PivotRule::Dantzig => {
                let mut min_val = -self.tolerance;
                let mut min_col = None;
                for j in candidates {
                    if state.data[obj_row][j] < min_val {
                        min_val = state.data[obj_row][j];
                        min_col = Some(j);
                    }
                }
                min_col
            }
            PivotRule::Bland => candidates.into_iter().find(|&j| state.data[obj_row][j] < -self.tolerance),
        }
    }

    fn find_pivot_row(&self, state: &BasisState, col: usize, rule: PivotRule) -> Option<usize> {
        let rhs_col = state.rhs_col();

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..state.num_rows() {
            let val = state.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = state.data[i][rhs_col].max(0.0) / val;
            let replace = match min_row {
                None => true,
                Some(current) => {
                    if ratio < min_ratio - self.tolerance {
                        true
                    } else if ratio <= min_ratio + self.tolerance {
                        rule == PivotRule::Bland && state.basic_vars[i] < state.basic_vars[current]
                    } else {
                        false
                    }
                }
            };
            if replace {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }

    fn extract_solution(
        &self,
        state: &BasisState,
        model: &Model,
        iterations: usize,
        degraded: bool,
    ) -> Solution {
        let n_vars = model.num_variables();
        let rhs_col = state.rhs_col();

        let mut values = vec![0.0; n_vars];
        for (i, &basic) in state.basic_vars.iter().enumerate() {
            if basic < n_vars {
                let value = state.data[i][rhs_col];
                values[basic] = if value.abs() <= self.tolerance { 0.0 } else { value };
            }
        }

        let objective_value = model.evaluate(&values);

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            degraded,
            iterations,
        }
    }
}

impl BasisState {
    fn from_model(model: &Model, tolerance: f64) -> Self {
        let n_vars = model.num_variables();
        let n_constraints = model.num_constraints();

        // Orient every row so its RHS is non-negative
        let oriented: Vec<(f64, Relation)> = model
            .constraints()
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    (-1.0, c.relation.flipped())
                } else {
                    (1.0, c.relation)
                }
            })
            .collect();

        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, relation) in &oriented {
            match relation {
                Relation::Le => n_slack += 1,
                Relation::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                Relation::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut state = BasisState {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            identity_cols: vec![0; n_constraints],
            row_signs: oriented.iter().map(|(sign, _)| *sign).collect(),
            tolerance,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (c, &(sign, relation))) in model.constraints().iter().zip(&oriented).enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate() {
                state.data[i][j] = sign * coef;
            }
            state.data[i][total_cols - 1] = sign * c.rhs;

            match relation {
                Relation::Le => {
                    state.data[i][slack_idx] = 1.0;
                    state.basic_vars[i] = slack_idx;
                    state.identity_cols[i] = slack_idx;
                    slack_idx += 1;
                }
                Relation::Ge => {
                    state.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    state.data[i][artificial_idx] = 1.0;
                    state.basic_vars[i] = artificial_idx;
                    state.identity_cols[i] = artificial_idx;
                    artificial_idx += 1;
                }
                Relation::Eq => {
                    state.data[i][artificial_idx] = 1.0;
                    state.basic_vars[i] = artificial_idx;
                    state.identity_cols[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        state
    }

    /// Replaces the objective row with the priced-out phase 2 objective.
    fn load_objective(&mut self, model: &Model) {
        let obj_row = self.obj_row();
        let n_cols = self.n_cols();
        let sign = model.sense().sign();

        for j in 0..n_cols {
            self.data[obj_row][j] = 0.0;
        }
        for (j, &coef) in model.objective().iter().enumerate() {
            self.data[obj_row][j] = sign * coef;
        }

        for i in 0..self.num_rows() {
            let basic = self.basic_vars[i];
            let cost = self.data[obj_row][basic];
            if cost != 0.0 {
                for j in 0..n_cols {
                    self.data[obj_row][j] -= cost * self.data[i][j];
                }
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_rows = self.data.len();
        let n_cols = self.n_cols();

        self.basic_vars[row] = col;

        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }
        self.data[row][col] = 1.0;

        for i in 0..n_rows {
            if i != row {
                let factor = self.data[i][col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n_cols {
                    self.data[i][j] -= factor * self.data[row][j];
                }
                self.data[i][col] = 0.0;
            }
        }
    }

    /// Sum of the values of artificial variables still in the basis.
    fn artificial_level(&self) -> f64 {
        let art_start = self.artificial_start();
        let rhs_col = self.rhs_col();
        self.basic_vars
            .iter()
            .enumerate()
            .filter(|&(_, &basic)| basic >= art_start)
            .map(|(i, _)| self.data[i][rhs_col].max(0.0))
            .sum()
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.basic_vars.len()
    }

    pub(crate) fn n_cols(&self) -> usize {
        self.data[0].len()
    }

    pub(crate) fn rhs_col(&self) -> usize {
        self.n_cols() - 1
    }

    pub(crate) fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    pub(crate) fn artificial_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    fn objective_cell(&self) -> f64 {
        self.data[self.obj_row()][self.rhs_col()]
    }

    /// Row in which each column is basic, if any.
    pub(crate) fn basic_rows(&self) -> Vec<Option<usize>> {
        let mut rows = vec![None; self.rhs_col()];
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            rows[basic] = Some(i);
        }
        rows
    }
}
