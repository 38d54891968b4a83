//! QP formulation.
//!
//! Transforms [`ProblemData`] into the canonical box-constrained QP tuple
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  l <= A x <= u
//! ```
//!
//! consumed uniformly by every solver backend. Two optimum-preserving
//! encodings exist: the dense form materializes the full `n x n` covariance
//! `F F' + D`, while the sparse form introduces auxiliary variables
//! `y = F' x` and keeps the quadratic cost block-diagonal.

use std::str::FromStr;

use nalgebra_sparse::CscMatrix;

use crate::data::ProblemData;
use crate::error::{FolioError, Result};
use crate::sparse::{
    csc_block_diag, csc_diag, csc_from_triplets, csc_hstack, csc_identity, csc_scale,
    csc_to_dense, csc_transpose, csc_vstack, dense_to_csc,
};

/// Algebraic encoding of the portfolio QP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reformulation {
    /// Materialize `P = 2 (F F' + D)` in full; `n` variables.
    Dense,
    /// Auxiliary `y = F' x`; `P = blkdiag(2D, 2I)`; `n + k` variables.
    Sparse,
}

impl FromStr for Reformulation {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dense" => Ok(Reformulation::Dense),
            "sparse" => Ok(Reformulation::Sparse),
            other => Err(FolioError::UnsupportedReformulation(other.to_string())),
        }
    }
}

impl std::fmt::Display for Reformulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reformulation::Dense => write!(f, "dense"),
            Reformulation::Sparse => write!(f, "sparse"),
        }
    }
}

/// Canonical QP tuple `(P, q, A, l, u)`.
///
/// `P` is stored full-symmetric; backends needing only a triangle extract
/// it themselves.
#[derive(Debug, Clone)]
pub struct QpTuple {
    /// Quadratic cost matrix, symmetric PSD.
    pub p: CscMatrix<f64>,
    /// Linear cost vector.
    pub q: Vec<f64>,
    /// Constraint matrix.
    pub a: CscMatrix<f64>,
    /// Elementwise lower bounds on `A x`.
    pub l: Vec<f64>,
    /// Elementwise upper bounds on `A x`.
    pub u: Vec<f64>,
}

impl QpTuple {
    /// Number of optimization variables.
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }

    /// Number of constraint rows.
    pub fn num_constraints(&self) -> usize {
        self.l.len()
    }

    /// Objective value at `x`: `(1/2) x' P x + q' x`.
    ///
    /// Every backend's reported objective is normalized through this, so
    /// results stay comparable across solvers.
    pub fn objective(&self, x: &[f64]) -> f64 {
        let linear: f64 = self.q.iter().zip(x).map(|(qi, xi)| qi * xi).sum();
        let mut quadratic = 0.0;
        for (row, col, val) in self.p.triplet_iter() {
            quadratic += 0.5 * *val * x[row] * x[col];
        }
        linear + quadratic
    }

    /// Check internal consistency of the tuple.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_vars();
        let m = self.num_constraints();

        if self.p.nrows() != n || self.p.ncols() != n {
            return Err(FolioError::DimensionMismatch {
                expected: format!("P of shape {}x{}", n, n),
                got: format!("{}x{}", self.p.nrows(), self.p.ncols()),
            });
        }
        if self.a.nrows() != m || self.a.ncols() != n {
            return Err(FolioError::DimensionMismatch {
                expected: format!("A of shape {}x{}", m, n),
                got: format!("{}x{}", self.a.nrows(), self.a.ncols()),
            });
        }
        if self.u.len() != m {
            return Err(FolioError::DimensionMismatch {
                expected: format!("u of length {}", m),
                got: format!("{}", self.u.len()),
            });
        }
        if self.l.iter().zip(&self.u).any(|(lo, hi)| lo > hi) {
            return Err(FolioError::InvalidData(
                "constraint bounds must satisfy l <= u".into(),
            ));
        }
        Ok(())
    }
}

/// Build the canonical QP tuple for the requested reformulation.
pub fn formulate(data: &ProblemData, mode: Reformulation) -> Result<QpTuple> {
    let tuple = match mode {
        Reformulation::Dense => dense_tuple(data),
        Reformulation::Sparse => sparse_tuple(data),
    };
    tuple.validate()?;
    Ok(tuple)
}

/// Dense encoding: `n` variables, `(n + 1)` constraint rows.
///
/// ```text
/// P = 2 (F F' + D)       q = -mu / gamma
/// A = [1'; I]            l = [1; 0]    u = [1; 1]
/// ```
fn dense_tuple(data: &ProblemData) -> QpTuple {
    let n = data.n;

    // F F' is materialized densely on purpose; that is the point of this
    // variant even when F itself is sparse.
    let f = csc_to_dense(&data.factors);
    let mut cov = &f * f.transpose();
    for i in 0..n {
        cov[(i, i)] += data.idio_var[i];
    }
    cov *= 2.0;
    let p = dense_to_csc(&cov);

    let q: Vec<f64> = data
        .expected_returns
        .iter()
        .map(|mu| -mu / data.risk_aversion)
        .collect();

    let budget = ones_row(n);
    let a = csc_vstack(&budget, &csc_identity(n));

    let mut l = vec![0.0; n + 1];
    l[0] = 1.0;
    let u = vec![1.0; n + 1];

    QpTuple { p, q, a, l, u }
}

/// Sparse encoding: stacked variables `[x; y]` with `y = F' x` enforced by
/// linking equality rows, `(1 + k + n)` constraint rows.
///
/// ```text
/// P = blkdiag(2D, 2I)    q = [-mu / gamma; 0]
/// A = [1'  0']           l = [1; 0; 0]    u = [1; 0; 1]
///     [F' -I ]
///     [I   0 ]
/// ```
fn sparse_tuple(data: &ProblemData) -> QpTuple {
    let (n, k) = (data.n, data.k);

    let p = csc_block_diag(
        &csc_scale(&csc_diag(data.idio_var.as_slice()), 2.0),
        &csc_scale(&csc_identity(k), 2.0),
    );

    let mut q: Vec<f64> = data
        .expected_returns
        .iter()
        .map(|mu| -mu / data.risk_aversion)
        .collect();
    q.extend(std::iter::repeat(0.0).take(k));

    let budget = csc_hstack(&ones_row(n), &CscMatrix::zeros(1, k));
    let linking = csc_hstack(
        &csc_transpose(&data.factors),
        &csc_scale(&csc_identity(k), -1.0),
    );
    let boxes = csc_hstack(&csc_identity(n), &CscMatrix::zeros(n, k));
    let a = csc_vstack(&csc_vstack(&budget, &linking), &boxes);

    let mut l = vec![0.0; 1 + k + n];
    l[0] = 1.0;
    let mut u = vec![0.0; 1 + k + n];
    u[0] = 1.0;
    for ui in u.iter_mut().skip(1 + k) {
        *ui = 1.0;
    }

    QpTuple { p, q, a, l, u }
}

/// All-ones row vector as a 1 x n CSC matrix.
fn ones_row(n: usize) -> CscMatrix<f64> {
    csc_from_triplets(1, n, vec![0; n], (0..n).collect(), vec![1.0; n])
}
