//! Dense active-set backend.
//!
//! Wraps the `quadprog` crate (Goldfarb-Idnani dual method), which expects
//! `A1 x = b1` followed by `A2 x <= b2` in row-major dense form. The tuple's
//! equality rows go first; each finite inequality bound becomes one `<=`
//! row. Requires a strictly convex `P`, which both portfolio encodings
//! provide whenever the idiosyncratic variances are positive.

use std::time::Instant;

use tracing::warn;

use super::{SolveReport, SolveStatus, SolverAdapter};
use crate::formulate::QpTuple;
use crate::sparse::csc_to_dense;

/// Rows whose bounds are this close are treated as equalities.
const EQ_TOL: f64 = 1e-12;

/// Active-set adapter over the `quadprog` crate.
pub struct ActiveSetSolver;

impl ActiveSetSolver {
    /// Create the adapter. The underlying method has no tunable options.
    pub fn new() -> Self {
        ActiveSetSolver
    }
}

impl Default for ActiveSetSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverAdapter for ActiveSetSolver {
    fn name(&self) -> &'static str {
        "active-set"
    }

    fn solve(&self, tuple: &QpTuple) -> SolveReport {
        let start = Instant::now();

        let n = tuple.num_vars();
        let m = tuple.num_constraints();

        let p = csc_to_dense(&tuple.p);
        let mut qmat = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                qmat[i * n + j] = p[(i, j)];
            }
        }

        let a = csc_to_dense(&tuple.a);
        let mut amat = Vec::new();
        let mut bvec = Vec::new();

        // Equality rows first: quadprog takes them as the leading meq rows.
        let mut meq = 0;
        for i in 0..m {
            if (tuple.u[i] - tuple.l[i]).abs() <= EQ_TOL {
                amat.extend((0..n).map(|j| a[(i, j)]));
                bvec.push(tuple.u[i]);
                meq += 1;
            }
        }
        for i in 0..m {
            if (tuple.u[i] - tuple.l[i]).abs() <= EQ_TOL {
                continue;
            }
            if tuple.u[i].is_finite() {
                amat.extend((0..n).map(|j| a[(i, j)]));
                bvec.push(tuple.u[i]);
            }
            if tuple.l[i].is_finite() {
                amat.extend((0..n).map(|j| -a[(i, j)]));
                bvec.push(-tuple.l[i]);
            }
        }

        match quadprog::solve_qp(&mut qmat, &tuple.q, &amat, &bvec, meq, false) {
            Ok(solution) => {
                let x = solution.sol;
                SolveReport {
                    status: SolveStatus::Optimal,
                    objective: Some(tuple.objective(&x)),
                    x: Some(x),
                    solve_time: start.elapsed().as_secs_f64(),
                    iterations: solution.iter,
                }
            }
            Err(err) => {
                warn!(error = %err, "active-set solve failed");
                let status = if matches!(err, quadprog::Error::Infeasible) {
                    SolveStatus::Infeasible
                } else {
                    SolveStatus::NumericalError
                };
                SolveReport::failure(status, start.elapsed().as_secs_f64(), 0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::{csc_diag, csc_from_triplets, csc_identity, csc_vstack};

    #[test]
    fn test_box_qp() {
        // minimize (1/2)(2 x0^2 + 2 x1^2) - 2 x0 - x1  s.t. 0 <= x <= 1
        let tuple = QpTuple {
            p: csc_diag(&[2.0, 2.0]),
            q: vec![-2.0, -1.0],
            a: csc_identity(2),
            l: vec![0.0, 0.0],
            u: vec![1.0, 1.0],
        };
        let report = ActiveSetSolver::new().solve(&tuple);
        assert_eq!(report.status, SolveStatus::Optimal);
        let x = report.x.unwrap();
        assert!((x[0] - 1.0).abs() < 1e-8, "x[0] = {}", x[0]);
        assert!((x[1] - 0.5).abs() < 1e-8, "x[1] = {}", x[1]);
        assert!((report.objective.unwrap() + 1.25).abs() < 1e-8);
    }

    #[test]
    fn test_simplex_qp() {
        // minimize (1/2) x' x  s.t. sum(x) = 1, 0 <= x <= 1
        // optimum is the uniform allocation, objective 1/(2*3)
        let tuple = QpTuple {
            p: csc_identity(3),
            q: vec![0.0; 3],
            a: csc_vstack(
                &csc_from_triplets(1, 3, vec![0; 3], vec![0, 1, 2], vec![1.0; 3]),
                &csc_identity(3),
            ),
            l: vec![1.0, 0.0, 0.0, 0.0],
            u: vec![1.0, 1.0, 1.0, 1.0],
        };
        let report = ActiveSetSolver::new().solve(&tuple);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert!((report.objective.unwrap() - 1.0 / 6.0).abs() < 1e-8);
    }

    #[test]
    fn test_infeasible_reported_as_status() {
        // x = 0 and x = 1 simultaneously
        let tuple = QpTuple {
            p: csc_identity(1),
            q: vec![0.0],
            a: csc_vstack(&csc_identity(1), &csc_identity(1)),
            l: vec![0.0, 1.0],
            u: vec![0.0, 1.0],
        };
        let report = ActiveSetSolver::new().solve(&tuple);
        assert_eq!(report.status, SolveStatus::Infeasible);
        assert!(report.objective.is_none());
    }

    #[test]
    fn test_singular_p_reported_as_numerical_error() {
        // zero quadratic term is not strictly convex
        let tuple = QpTuple {
            p: csc_from_triplets(1, 1, vec![], vec![], vec![]),
            q: vec![1.0],
            a: csc_identity(1),
            l: vec![0.0],
            u: vec![1.0],
        };
        let report = ActiveSetSolver::new().solve(&tuple);
        assert_eq!(report.status, SolveStatus::NumericalError);
        assert!(report.x.is_none());
    }
}
