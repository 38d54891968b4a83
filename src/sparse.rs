//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices. The
//! formulator assembles its constraint matrices from these blocks.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    // Build COO matrix first
    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    // Convert to CSC
    CscMatrix::from(&coo)
}

/// Create a CSC identity matrix.
pub fn csc_identity(n: usize) -> CscMatrix<f64> {
    CscMatrix::identity(n)
}

/// Create a CSC diagonal matrix from its diagonal entries.
pub fn csc_diag(diag: &[f64]) -> CscMatrix<f64> {
    let n = diag.len();
    let idx: Vec<usize> = (0..n).collect();
    csc_from_triplets(n, n, idx.clone(), idx, diag.to_vec())
}

/// Convert a dense matrix to CSC format.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for j in 0..dense.ncols() {
        for i in 0..dense.nrows() {
            let v = dense[(i, j)];
            if v.abs() > 1e-15 {
                rows.push(i);
                cols.push(j);
                vals.push(v);
            }
        }
    }

    csc_from_triplets(dense.nrows(), dense.ncols(), rows, cols, vals)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] = *val;
    }
    dense
}

/// Transpose a CSC matrix.
pub fn csc_transpose(m: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for (r, c, v) in m.triplet_iter() {
        rows.push(c);
        cols.push(r);
        vals.push(*v);
    }

    csc_from_triplets(m.ncols(), m.nrows(), rows, cols, vals)
}

/// Stack two CSC matrices vertically.
pub fn csc_vstack(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for (r, c, v) in a.triplet_iter() {
        rows.push(r);
        cols.push(c);
        vals.push(*v);
    }
    for (r, c, v) in b.triplet_iter() {
        rows.push(r + a.nrows());
        cols.push(c);
        vals.push(*v);
    }

    csc_from_triplets(
        a.nrows() + b.nrows(),
        a.ncols().max(b.ncols()),
        rows,
        cols,
        vals,
    )
}

/// Stack two CSC matrices horizontally.
pub fn csc_hstack(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for (r, c, v) in a.triplet_iter() {
        rows.push(r);
        cols.push(c);
        vals.push(*v);
    }
    for (r, c, v) in b.triplet_iter() {
        rows.push(r);
        cols.push(c + a.ncols());
        vals.push(*v);
    }

    csc_from_triplets(
        a.nrows().max(b.nrows()),
        a.ncols() + b.ncols(),
        rows,
        cols,
        vals,
    )
}

/// Assemble a block-diagonal matrix from two CSC blocks.
pub fn csc_block_diag(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for (r, c, v) in a.triplet_iter() {
        rows.push(r);
        cols.push(c);
        vals.push(*v);
    }
    for (r, c, v) in b.triplet_iter() {
        rows.push(r + a.nrows());
        cols.push(c + a.ncols());
        vals.push(*v);
    }

    csc_from_triplets(
        a.nrows() + b.nrows(),
        a.ncols() + b.ncols(),
        rows,
        cols,
        vals,
    )
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    let values: Vec<f64> = a.values().iter().map(|v| v * scalar).collect();
    let col_offsets: Vec<usize> = a.col_offsets().to_vec();
    let row_indices: Vec<usize> = a.row_indices().to_vec();
    CscMatrix::try_from_csc_data(a.nrows(), a.ncols(), col_offsets, row_indices, values)
        .unwrap_or_else(|_| CscMatrix::zeros(a.nrows(), a.ncols()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csc_from_triplets() {
        let m = csc_from_triplets(3, 3, vec![0, 1, 2], vec![0, 1, 2], vec![1.0, 2.0, 3.0]);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m.nnz(), 3);
    }

    #[test]
    fn test_csc_diag() {
        let m = csc_diag(&[1.0, 2.0, 3.0]);
        let d = csc_to_dense(&m);
        assert_eq!(d[(1, 1)], 2.0);
        assert_eq!(d[(0, 1)], 0.0);
    }

    #[test]
    fn test_csc_transpose() {
        let m = csc_from_triplets(2, 3, vec![0, 1], vec![2, 0], vec![5.0, 7.0]);
        let t = csc_transpose(&m);
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.ncols(), 2);
        let d = csc_to_dense(&t);
        assert_eq!(d[(2, 0)], 5.0);
        assert_eq!(d[(0, 1)], 7.0);
    }

    #[test]
    fn test_csc_vstack() {
        let a = csc_identity(2);
        let b = csc_from_triplets(1, 2, vec![0, 0], vec![0, 1], vec![1.0, 1.0]);
        let s = csc_vstack(&a, &b);
        assert_eq!(s.nrows(), 3);
        assert_eq!(s.ncols(), 2);
        let d = csc_to_dense(&s);
        assert_eq!(d[(2, 0)], 1.0);
        assert_eq!(d[(2, 1)], 1.0);
    }

    #[test]
    fn test_csc_hstack() {
        let a = csc_identity(2);
        let b = CscMatrix::zeros(2, 3);
        let s = csc_hstack(&a, &b);
        assert_eq!(s.nrows(), 2);
        assert_eq!(s.ncols(), 5);
    }

    #[test]
    fn test_csc_block_diag() {
        let a = csc_diag(&[1.0, 2.0]);
        let b = csc_diag(&[3.0]);
        let m = csc_block_diag(&a, &b);
        assert_eq!(m.nrows(), 3);
        let d = csc_to_dense(&m);
        assert_eq!(d[(2, 2)], 3.0);
        assert_eq!(d[(2, 0)], 0.0);
    }
}
