//! Entrywise matrix norms and reshaping for operators in either storage.
//!
//! Sparse operators are walked through their stored triplets, dense operators
//! entry by entry; both give the same values for the same matrix.

use crate::{
    error::{OperatorError, OperatorErrorKind},
    operator::{Operator, Storage},
    sparse::{self, SparseMatrix},
};
use faer::{c64, sparse::Triplet};

/// Visits every (stored) entry of the operator.
fn for_each_entry(op: &Operator, mut f: impl FnMut(usize, usize, c64)) {
    match op.storage() {
        Storage::Dense(m) => {
            for j in 0..m.ncols() {
                for i in 0..m.nrows() {
                    f(i, j, m[(i, j)]);
                }
            }
        }
        Storage::Sparse(m) => {
            for t in m.as_ref().triplet_iter() {
                f(t.row, t.col, *t.val);
            }
        }
    }
}

/// Maximum absolute column sum.
pub fn one_norm(op: &Operator) -> f64 {
    match op.storage() {
        Storage::Sparse(m) => sparse_one_norm(m),
        Storage::Dense(_) => {
            let mut sums = vec![0.0f64; op.ncols()];
            for_each_entry(op, |_, j, z| sums[j] += z.norm());
            sums.into_iter().fold(0.0, f64::max)
        }
    }
}

/// Maximum absolute column sum of a raw sparse matrix.
pub fn sparse_one_norm(a: &SparseMatrix) -> f64 {
    let mut sums = vec![0.0f64; a.ncols()];
    for t in a.as_ref().triplet_iter() {
        sums[t.col] += t.val.norm();
    }
    sums.into_iter().fold(0.0, f64::max)
}

/// Maximum absolute row sum.
pub fn inf_norm(op: &Operator) -> f64 {
    let mut sums = vec![0.0f64; op.nrows()];
    for_each_entry(op, |i, _, z| sums[i] += z.norm());
    sums.into_iter().fold(0.0, f64::max)
}

/// Frobenius norm, `sqrt(tr(A A^H))`.
pub fn frobenius_norm(op: &Operator) -> f64 {
    let mut total = 0.0;
    for_each_entry(op, |_, _, z| total += z.norm_sqr());
    total.sqrt()
}

/// Largest entry modulus; `0` for an all-zero matrix.
pub fn max_norm(op: &Operator) -> f64 {
    let mut best = 0.0f64;
    for_each_entry(op, |_, _, z| best = best.max(z.norm()));
    best
}

/// Euclidean norm of a ket or bra.
pub fn l2_norm(op: &Operator) -> Result<f64, OperatorError> {
    if !op.kind().is_vector_like() {
        return Err(OperatorErrorKind::InvalidOperatorType {
            operation: "the L2 norm",
            kind: op.kind(),
        }
        .into());
    }
    Ok(frobenius_norm(op))
}

/// Reshapes a sparse matrix, remapping entries through their row-major flat index.
pub fn reshape(a: &SparseMatrix, shape: (usize, usize)) -> Result<SparseMatrix, OperatorError> {
    let (rows, cols) = shape;
    if rows * cols != a.nrows() * a.ncols() {
        return Err(OperatorErrorKind::ReshapeSizeMismatch {
            from_rows: a.nrows(),
            from_cols: a.ncols(),
            to_rows: rows,
            to_cols: cols,
        }
        .into());
    }
    let from_cols = a.ncols();
    let triplets: Vec<_> = a
        .as_ref()
        .triplet_iter()
        .map(|t| {
            let flat = t.row * from_cols + t.col;
            Triplet {
                row: flat / cols,
                col: flat % cols,
                val: *t.val,
            }
        })
        .collect();
    sparse::from_triplets(rows, cols, &triplets)
}
