//! Sparse construction and arithmetic helpers on top of [`faer::sparse::SparseColMat`].
//!
//! All matrices in this crate use `usize` indices and complex double precision
//! values. Construction goes through triplets (duplicate entries are summed by
//! `try_new_from_triplets`); sums, scaling, products and adjoints are delegated to
//! faer's sparse arithmetic.

use crate::error::{OperatorError, OperatorErrorKind};
use faer::{
    Mat, MatRef, Scale, c64,
    sparse::{SparseColMat, Triplet},
};

/// Shorthand for the sparse storage used throughout the crate.
pub type SparseMatrix = SparseColMat<usize, c64>;

/// Builds a sparse matrix from triplets, mapping faer's creation error into ours.
pub fn from_triplets(
    nrows: usize,
    ncols: usize,
    triplets: &[Triplet<usize, usize, c64>],
) -> Result<SparseMatrix, OperatorError> {
    SparseColMat::try_new_from_triplets(nrows, ncols, triplets).map_err(|e| {
        OperatorErrorKind::SparseConstruction(format!("{nrows}x{ncols} from triplets: {e:?}"))
            .into()
    })
}

/// Collects the stored entries of `a` as owned triplets.
pub fn triplets(a: &SparseMatrix) -> Vec<Triplet<usize, usize, c64>> {
    a.as_ref().triplet_iter()
        .map(|t| Triplet {
            row: t.row,
            col: t.col,
            val: *t.val,
        })
        .collect()
}

/// The `n x n` sparse identity.
pub fn identity(n: usize) -> SparseMatrix {
    let triplets: Vec<_> = (0..n)
        .map(|i| Triplet {
            row: i,
            col: i,
            val: c64::new(1.0, 0.0),
        })
        .collect();
    // Diagonal triplets are always in bounds and unique.
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .unwrap_or_else(|_| unreachable!("identity triplets are valid"))
}

/// An empty `nrows x ncols` sparse matrix.
pub fn zeros(nrows: usize, ncols: usize) -> SparseMatrix {
    SparseColMat::try_new_from_triplets(nrows, ncols, &[])
        .unwrap_or_else(|_| unreachable!("an empty triplet list is valid"))
}

/// Converts a dense matrix to sparse storage, dropping exact zeros.
pub fn from_dense(a: MatRef<'_, c64>) -> Result<SparseMatrix, OperatorError> {
    let mut triplets = Vec::new();
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let val = a[(i, j)];
            if val.re != 0.0 || val.im != 0.0 {
                triplets.push(Triplet { row: i, col: j, val });
            }
        }
    }
    from_triplets(a.nrows(), a.ncols(), &triplets)
}

/// Materializes a sparse matrix as a dense one.
pub fn to_dense(a: &SparseMatrix) -> Mat<c64> {
    a.as_ref().to_dense()
}

/// Computes `sum_k alpha_k * A_k` for same-shaped sparse matrices.
///
/// # Panics
///
/// Panics if the terms do not all share the shape `nrows x ncols`.
pub fn linear_combination(
    nrows: usize,
    ncols: usize,
    terms: &[(c64, &SparseMatrix)],
) -> SparseMatrix {
    terms.iter().fold(zeros(nrows, ncols), |acc, &(alpha, a)| {
        assert_eq!(
            (a.nrows(), a.ncols()),
            (nrows, ncols),
            "linear combination terms must share a shape"
        );
        acc.as_ref() + scale(a, alpha).as_ref()
    })
}

/// Computes `alpha * A`.
pub fn scale(a: &SparseMatrix, alpha: c64) -> SparseMatrix {
    Scale(alpha) * a.as_ref()
}

/// Sparse-sparse product `A * B`.
///
/// # Panics
///
/// Panics if the inner dimensions disagree.
pub fn matmul(a: &SparseMatrix, b: &SparseMatrix) -> SparseMatrix {
    assert_eq!(
        a.ncols(),
        b.nrows(),
        "Dimension mismatch: lhs columns ({}) do not match rhs rows ({}).",
        a.ncols(),
        b.nrows(),
    );
    a.as_ref() * b.as_ref()
}

/// The conjugate transpose `A^H`, converted back to column-major storage.
pub fn adjoint(a: &SparseMatrix) -> Result<SparseMatrix, OperatorError> {
    a.as_ref().adjoint().to_col_major().map_err(|e| {
        OperatorErrorKind::SparseConstruction(format!(
            "adjoint of a {}x{} matrix: {e:?}",
            a.nrows(),
            a.ncols()
        ))
        .into()
    })
}

/// The largest entry modulus of `A - A^H`, walking stored entries only.
///
/// Returns `f64::INFINITY` for rectangular matrices.
pub fn hermitian_defect(a: &SparseMatrix) -> Result<f64, OperatorError> {
    if a.nrows() != a.ncols() {
        return Ok(f64::INFINITY);
    }
    let ah = adjoint(a)?;
    let diff = a.as_ref() - ah.as_ref();
    Ok(diff.val().iter().map(|z| z.norm()).fold(0.0, f64::max))
}
