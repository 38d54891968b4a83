//! Portfolio problem data.
//!
//! [`ProblemData`] carries the raw inputs of the Markowitz model: sparse
//! factor loadings `F`, the diagonal idiosyncratic variance `D`, expected
//! returns `mu` and the risk-aversion parameter `gamma`. Instances are
//! validated on construction and immutable afterwards.

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{FolioError, Result};
use crate::sparse::csc_from_triplets;

/// Raw inputs of the portfolio optimization problem:
///
/// ```text
/// maximize    mu' x - gamma * x' (F F' + D) x
/// subject to  sum(x) = 1,  0 <= x <= 1
/// ```
#[derive(Debug, Clone)]
pub struct ProblemData {
    /// Number of risk factors.
    pub k: usize,
    /// Number of assets (conventionally `n >> k`).
    pub n: usize,
    /// Factor loadings `F`, an `n x k` sparse matrix.
    pub factors: CscMatrix<f64>,
    /// Diagonal of the idiosyncratic variance matrix `D`, length `n`.
    pub idio_var: DVector<f64>,
    /// Expected returns `mu`, length `n`.
    pub expected_returns: DVector<f64>,
    /// Risk-aversion parameter `gamma`.
    pub risk_aversion: f64,
}

impl ProblemData {
    /// Create problem data, validating every shape and value domain.
    ///
    /// Shape inconsistencies surface as [`FolioError::DimensionMismatch`]
    /// here, before any solver is ever invoked.
    pub fn new(
        k: usize,
        n: usize,
        factors: CscMatrix<f64>,
        idio_var: DVector<f64>,
        expected_returns: DVector<f64>,
        risk_aversion: f64,
    ) -> Result<Self> {
        if k == 0 || n == 0 {
            return Err(FolioError::InvalidData(format!(
                "dimensions must be positive, got k={}, n={}",
                k, n
            )));
        }
        if factors.nrows() != n || factors.ncols() != k {
            return Err(FolioError::DimensionMismatch {
                expected: format!("F of shape {}x{}", n, k),
                got: format!("{}x{}", factors.nrows(), factors.ncols()),
            });
        }
        if idio_var.len() != n {
            return Err(FolioError::DimensionMismatch {
                expected: format!("diag(D) of length {}", n),
                got: format!("{}", idio_var.len()),
            });
        }
        if expected_returns.len() != n {
            return Err(FolioError::DimensionMismatch {
                expected: format!("mu of length {}", n),
                got: format!("{}", expected_returns.len()),
            });
        }
        if idio_var.iter().any(|&d| d < 0.0) {
            return Err(FolioError::InvalidData(
                "idiosyncratic variances must be non-negative".into(),
            ));
        }
        if risk_aversion <= 0.0 {
            return Err(FolioError::InvalidData(format!(
                "risk aversion must be positive, got {}",
                risk_aversion
            )));
        }

        Ok(ProblemData {
            k,
            n,
            factors,
            idio_var,
            expected_returns,
            risk_aversion,
        })
    }

    /// Generate a random instance from an explicit seed.
    ///
    /// Mirrors the conventional benchmark generator:
    /// - `F` is `n x k` sparse with `round(density * n * k)` nonzeros placed
    ///   uniformly at random, values uniform in `[0, 1)`;
    /// - `diag(D)` is uniform in `[0, 1)` scaled by `sqrt(k)`;
    /// - `mu` is standard normal;
    /// - `gamma = 1`.
    ///
    /// The draw order (F positions, F values, D, mu) is fixed, so a seed
    /// fully determines the instance.
    pub fn random(k: usize, n: usize, density: f64, seed: u64) -> Result<Self> {
        if k == 0 || n == 0 {
            return Err(FolioError::InvalidData(format!(
                "dimensions must be positive, got k={}, n={}",
                k, n
            )));
        }
        if !(density > 0.0 && density <= 1.0) {
            return Err(FolioError::InvalidData(format!(
                "density must be in (0, 1], got {}",
                density
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);

        let total = n * k;
        let nnz = ((density * total as f64).round() as usize).clamp(1, total);
        let positions = sample(&mut rng, total, nnz);

        let mut rows = Vec::with_capacity(nnz);
        let mut cols = Vec::with_capacity(nnz);
        let mut vals = Vec::with_capacity(nnz);
        for idx in positions.iter() {
            rows.push(idx % n);
            cols.push(idx / n);
            vals.push(rng.gen::<f64>());
        }
        let factors = csc_from_triplets(n, k, rows, cols, vals);

        let scale = (k as f64).sqrt();
        let idio_var = DVector::from_fn(n, |_, _| rng.gen::<f64>() * scale);
        let expected_returns = DVector::from_fn(n, |_, _| {
            let v: f64 = rng.sample(StandardNormal);
            v
        });

        Self::new(k, n, factors, idio_var, expected_returns, 1.0)
    }
}
