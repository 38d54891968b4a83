//! Clarabel interior-point backend.
//!
//! Converts the box-constrained tuple `l <= A x <= u` into Clarabel's conic
//! form `A x + s = b, s in K`: rows with `l = u` land in the zero cone,
//! finite inequality bounds are split into nonnegative-cone rows.

use std::time::Instant;

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};

use super::{SolveReport, SolveStatus, SolverAdapter};
use crate::formulate::QpTuple;

/// Rows whose bounds are this close are treated as equalities.
const EQ_TOL: f64 = 1e-12;

/// Clarabel solver settings.
#[derive(Debug, Clone)]
pub struct ClarabelSettings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute duality-gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality-gap tolerance.
    pub tol_gap_rel: f64,
}

impl Default for ClarabelSettings {
    fn default() -> Self {
        ClarabelSettings {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::PrimalInfeasible => SolveStatus::Infeasible,
            SolverStatus::DualInfeasible => SolveStatus::Unbounded,
            SolverStatus::MaxIterations => SolveStatus::MaxIterations,
            SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError => SolveStatus::NumericalError,
            _ => SolveStatus::Unknown,
        }
    }
}

/// Interior-point adapter over the `clarabel` crate.
pub struct ClarabelSolver {
    settings: ClarabelSettings,
}

impl ClarabelSolver {
    /// Create an adapter with the given settings.
    pub fn new(settings: ClarabelSettings) -> Self {
        ClarabelSolver { settings }
    }
}

impl SolverAdapter for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, tuple: &QpTuple) -> SolveReport {
        let start = Instant::now();

        let p = upper_triangle_csc(tuple);
        let (a, b, cones) = to_conic_form(tuple);

        let mut settings = DefaultSettings::default();
        settings.verbose = self.settings.verbose;
        settings.max_iter = self.settings.max_iter;
        settings.time_limit = self.settings.time_limit;
        settings.tol_gap_abs = self.settings.tol_gap_abs;
        settings.tol_gap_rel = self.settings.tol_gap_rel;

        let mut solver = DefaultSolver::new(&p, &tuple.q, &a, &b, &cones, settings);
        solver.solve();

        let status: SolveStatus = solver.solution.status.into();
        let solve_time = start.elapsed().as_secs_f64();
        let iterations = solver.info.iterations as usize;

        if status == SolveStatus::Optimal {
            let x = solver.solution.x.clone();
            SolveReport {
                status,
                objective: Some(tuple.objective(&x)),
                x: Some(x),
                solve_time,
                iterations,
            }
        } else {
            SolveReport::failure(status, solve_time, iterations)
        }
    }
}

/// Upper triangle of `P` in Clarabel CSC format.
fn upper_triangle_csc(tuple: &QpTuple) -> ClarabelCsc<f64> {
    let n = tuple.num_vars();
    let mut triplets: Vec<(usize, usize, f64)> = tuple
        .p
        .triplet_iter()
        .filter(|(r, c, _)| r <= c)
        .map(|(r, c, v)| (r, c, *v))
        .collect();
    triplets.sort_by_key(|&(r, c, _)| (c, r));
    triplets_to_clarabel(n, n, &triplets)
}

/// Split the box rows of the tuple into Clarabel cones.
fn to_conic_form(tuple: &QpTuple) -> (ClarabelCsc<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
    let m = tuple.num_constraints();
    let n = tuple.num_vars();

    // Row-wise view of A.
    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); m];
    for (r, c, v) in tuple.a.triplet_iter() {
        rows[r].push((c, *v));
    }

    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    let mut b = Vec::new();
    let mut out_row = 0;

    // Zero cone first: rows with l = u.
    let mut num_eq = 0;
    for i in 0..m {
        if (tuple.u[i] - tuple.l[i]).abs() <= EQ_TOL {
            for &(c, v) in &rows[i] {
                triplets.push((out_row, c, v));
            }
            b.push(tuple.u[i]);
            out_row += 1;
            num_eq += 1;
        }
    }

    // Nonnegative cone: each finite inequality bound becomes one row.
    let mut num_ineq = 0;
    for i in 0..m {
        if (tuple.u[i] - tuple.l[i]).abs() <= EQ_TOL {
            continue;
        }
        if tuple.u[i].is_finite() {
            for &(c, v) in &rows[i] {
                triplets.push((out_row, c, v));
            }
            b.push(tuple.u[i]);
            out_row += 1;
            num_ineq += 1;
        }
        if tuple.l[i].is_finite() {
            for &(c, v) in &rows[i] {
                triplets.push((out_row, c, -v));
            }
            b.push(-tuple.l[i]);
            out_row += 1;
            num_ineq += 1;
        }
    }

    let mut cones = Vec::new();
    if num_eq > 0 {
        cones.push(SupportedConeT::ZeroConeT(num_eq));
    }
    if num_ineq > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(num_ineq));
    }

    triplets.sort_by_key(|&(r, c, _)| (c, r));
    (triplets_to_clarabel(out_row, n, &triplets), b, cones)
}

/// Assemble a Clarabel CSC matrix from column-sorted triplets.
fn triplets_to_clarabel(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> ClarabelCsc<f64> {
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::with_capacity(triplets.len());
    let mut nzval = Vec::with_capacity(triplets.len());

    for &(r, c, v) in triplets {
        colptr[c + 1] += 1;
        rowval.push(r);
        nzval.push(v);
    }
    for j in 0..ncols {
        colptr[j + 1] += colptr[j];
    }

    ClarabelCsc::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::{csc_diag, csc_identity, csc_vstack};

    #[test]
    fn test_default_settings() {
        let settings = ClarabelSettings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 200);
    }

    #[test]
    fn test_conic_conversion_splits_rows() {
        // One equality row and two box rows.
        let tuple = QpTuple {
            p: csc_identity(2),
            q: vec![0.0, 0.0],
            a: csc_vstack(
                &crate::sparse::csc_from_triplets(1, 2, vec![0, 0], vec![0, 1], vec![1.0, 1.0]),
                &csc_identity(2),
            ),
            l: vec![1.0, 0.0, 0.0],
            u: vec![1.0, 1.0, 1.0],
        };
        let (a, b, cones) = to_conic_form(&tuple);
        assert_eq!(a.m, 5);
        assert_eq!(b.len(), 5);
        assert_eq!(cones.len(), 2);
    }

    #[test]
    fn test_solve_box_qp() {
        // minimize (1/2)(2 x0^2 + 2 x1^2) - 2 x0 - x1  s.t. 0 <= x <= 1
        // unconstrained optimum (1, 0.5) is interior, value -1.25
        let tuple = QpTuple {
            p: csc_diag(&[2.0, 2.0]),
            q: vec![-2.0, -1.0],
            a: csc_identity(2),
            l: vec![0.0, 0.0],
            u: vec![1.0, 1.0],
        };
        let solver = ClarabelSolver::new(ClarabelSettings::default());
        let report = solver.solve(&tuple);
        assert_eq!(report.status, SolveStatus::Optimal);
        let x = report.x.unwrap();
        // x[0] sits on an active bound; accuracy there is set by the
        // feasibility tolerances, not the duality gap.
        assert!((x[0] - 1.0).abs() < 1e-4, "x[0] = {}", x[0]);
        assert!((x[1] - 0.5).abs() < 1e-4, "x[1] = {}", x[1]);
        assert!((report.objective.unwrap() + 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_solve_equality_qp() {
        // minimize (1/2)(x0^2 + x1^2)  s.t. x0 + x1 = 1; optimum (0.5, 0.5)
        let tuple = QpTuple {
            p: csc_identity(2),
            q: vec![0.0, 0.0],
            a: crate::sparse::csc_from_triplets(1, 2, vec![0, 0], vec![0, 1], vec![1.0, 1.0]),
            l: vec![1.0],
            u: vec![1.0],
        };
        let solver = ClarabelSolver::new(ClarabelSettings::default());
        let report = solver.solve(&tuple);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert!((report.objective.unwrap() - 0.25).abs() < 1e-6);
    }
}
