//! This module defines the core abstraction for linear operators.
//!
//! The iterative routines in this crate, the Krylov eigensolvers and the one-norm
//! estimator, never look at individual matrix entries. Their fundamental operations
//! are the products `A * x` and `A^H * x`. Writing them against the [`LinearOperator`]
//! trait lets the same code run on dense matrices, sparse matrices, and operators
//! that are only defined by their action, such as the LU-backed [`InverseOperator`]
//! used by the condition estimator.

use crate::{
    error::{OperatorError, OperatorErrorKind},
    sparse::{self, SparseMatrix},
};
use faer::{
    Mat, MatRef, c64,
    linalg::solvers::PartialPivLu,
    prelude::*,
    sparse::linalg::solvers::Lu,
};

/// Represents a square or rectangular linear operator over `c64` that can be
/// applied, together with its conjugate transpose, to a block of vectors.
pub trait LinearOperator {
    /// Returns the number of rows of the operator.
    fn nrows(&self) -> usize;

    /// Returns the number of columns of the operator.
    fn ncols(&self) -> usize;

    /// Computes `A * rhs`.
    ///
    /// # Panics
    ///
    /// Implementations panic if `rhs.nrows() != self.ncols()`.
    fn apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64>;

    /// Computes `A^H * rhs`.
    ///
    /// # Panics
    ///
    /// Implementations panic if `rhs.nrows() != self.nrows()`.
    fn adjoint_apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64>;
}

impl<'a> LinearOperator for MatRef<'a, c64> {
    #[inline]
    fn nrows(&self) -> usize {
        MatRef::nrows(self)
    }

    #[inline]
    fn ncols(&self) -> usize {
        MatRef::ncols(self)
    }

    #[inline]
    fn apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        assert_eq!(
            MatRef::ncols(self),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            MatRef::ncols(self),
            rhs.nrows(),
        );
        *self * rhs
    }

    #[inline]
    fn adjoint_apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        assert_eq!(
            MatRef::nrows(self),
            rhs.nrows(),
            "Dimension mismatch: operator rows ({}) do not match vector rows ({}).",
            MatRef::nrows(self),
            rhs.nrows(),
        );
        self.adjoint() * rhs
    }
}

impl LinearOperator for Mat<c64> {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().ncols()
    }

    #[inline]
    fn apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        LinearOperator::apply(&self.as_ref(), rhs)
    }

    #[inline]
    fn adjoint_apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        LinearOperator::adjoint_apply(&self.as_ref(), rhs)
    }
}

impl LinearOperator for SparseMatrix {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().ncols()
    }

    #[inline]
    fn apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        assert_eq!(
            self.as_ref().ncols(),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            self.as_ref().ncols(),
            rhs.nrows(),
        );
        self.as_ref() * rhs
    }

    #[inline]
    fn adjoint_apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        assert_eq!(
            self.as_ref().nrows(),
            rhs.nrows(),
            "Dimension mismatch: operator rows ({}) do not match vector rows ({}).",
            self.as_ref().nrows(),
            rhs.nrows(),
        );
        self.as_ref().adjoint() * rhs
    }
}

/// Applies `A^{-1}` and `A^{-H}` through LU factorizations of `A` and `A^H`.
///
/// The inverse is never formed. Dense operators are factored with partial pivoting,
/// sparse operators with faer's sparse LU.
pub enum InverseOperator {
    Dense {
        lu: PartialPivLu<c64>,
        lu_adjoint: PartialPivLu<c64>,
        dim: usize,
    },
    Sparse {
        lu: Lu<usize, c64>,
        lu_adjoint: Lu<usize, c64>,
        dim: usize,
    },
}

impl InverseOperator {
    /// Factors a dense square matrix.
    pub fn from_dense(a: MatRef<'_, c64>) -> Result<Self, OperatorError> {
        ensure_square(a.nrows(), a.ncols())?;
        Ok(Self::Dense {
            lu: a.partial_piv_lu(),
            lu_adjoint: a.adjoint().to_owned().partial_piv_lu(),
            dim: a.nrows(),
        })
    }

    /// Factors a sparse square matrix. A structurally or numerically singular
    /// factorization is reported as [`OperatorErrorKind::SingularSystem`].
    pub fn from_sparse(a: &SparseMatrix) -> Result<Self, OperatorError> {
        ensure_square(a.nrows(), a.ncols())?;
        let singular = |_| -> OperatorError {
            OperatorErrorKind::SingularSystem {
                context: "factoring the operator for the inverse norm",
            }
            .into()
        };
        let adjoint = sparse::adjoint(a)?;
        Ok(Self::Sparse {
            lu: a.as_ref().sp_lu().map_err(singular)?,
            lu_adjoint: adjoint.as_ref().sp_lu().map_err(singular)?,
            dim: a.nrows(),
        })
    }

    fn dim(&self) -> usize {
        match self {
            Self::Dense { dim, .. } | Self::Sparse { dim, .. } => *dim,
        }
    }

    /// Solves `A x = rhs`, rejecting non-finite solutions as singular.
    pub fn solve(&self, rhs: MatRef<'_, c64>) -> Result<Mat<c64>, OperatorError> {
        let x = match self {
            Self::Dense { lu, .. } => lu.solve(rhs),
            Self::Sparse { lu, .. } => lu.solve(rhs),
        };
        finite_or_singular(x)
    }

    /// Solves `A^H x = rhs`, rejecting non-finite solutions as singular.
    pub fn solve_adjoint(&self, rhs: MatRef<'_, c64>) -> Result<Mat<c64>, OperatorError> {
        let x = match self {
            Self::Dense { lu_adjoint, .. } => lu_adjoint.solve(rhs),
            Self::Sparse { lu_adjoint, .. } => lu_adjoint.solve(rhs),
        };
        finite_or_singular(x)
    }
}

/// The trait form yields non-finite entries for a singular operator instead of an
/// error; callers that need a hard failure use [`InverseOperator::solve`].
impl LinearOperator for InverseOperator {
    fn nrows(&self) -> usize {
        self.dim()
    }

    fn ncols(&self) -> usize {
        self.dim()
    }

    fn apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        match self {
            Self::Dense { lu, .. } => lu.solve(rhs),
            Self::Sparse { lu, .. } => lu.solve(rhs),
        }
    }

    fn adjoint_apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        match self {
            Self::Dense { lu_adjoint, .. } => lu_adjoint.solve(rhs),
            Self::Sparse { lu_adjoint, .. } => lu_adjoint.solve(rhs),
        }
    }
}

pub(crate) fn ensure_square(nrows: usize, ncols: usize) -> Result<(), OperatorError> {
    if nrows != ncols {
        return Err(OperatorErrorKind::NonSquare { nrows, ncols }.into());
    }
    Ok(())
}

fn finite_or_singular(x: Mat<c64>) -> Result<Mat<c64>, OperatorError> {
    if x.is_all_finite() {
        Ok(x)
    } else {
        Err(OperatorErrorKind::SingularSystem {
            context: "applying the inverse operator",
        }
        .into())
    }
}

// Unit tests to verify the correctness of the LinearOperator trait and its implementations.
#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> c64 {
        c64::new(re, im)
    }

    fn sample() -> Mat<c64> {
        Mat::from_fn(3, 3, |i, j| match (i, j) {
            (0, 0) => c(2.0, 0.0),
            (0, 1) => c(-1.0, 1.0),
            (1, 0) => c(0.5, 0.0),
            (1, 1) => c(3.0, 0.0),
            (2, 2) => c(1.0, -2.0),
            _ => c(0.0, 0.0),
        })
    }

    #[test]
    fn test_linear_operator_dense_and_sparse_agree() {
        let matrix = sample();
        let vector = Mat::from_fn(3, 1, |i, _| c(i as f64 + 1.0, 0.5));
        let sparse = sparse::from_dense(matrix.as_ref()).unwrap();

        let dense_op: &dyn LinearOperator = &matrix;
        let sparse_op: &dyn LinearOperator = &sparse;

        let expected = &matrix * &vector;
        assert!((&dense_op.apply(vector.as_ref()) - &expected).norm_l2() < 1e-14);
        assert!((&sparse_op.apply(vector.as_ref()) - &expected).norm_l2() < 1e-14);

        let expected_adjoint = matrix.adjoint() * &vector;
        assert!((&dense_op.adjoint_apply(vector.as_ref()) - &expected_adjoint).norm_l2() < 1e-14);
        assert!((&sparse_op.adjoint_apply(vector.as_ref()) - &expected_adjoint).norm_l2() < 1e-14);
        assert_eq!(sparse_op.nrows(), 3);
        assert_eq!(sparse_op.ncols(), 3);
    }

    #[test]
    fn test_inverse_operator_inverts() {
        let matrix = sample();
        let vector = Mat::from_fn(3, 1, |i, _| c(1.0, i as f64));
        let b = &matrix * &vector;

        let dense_inv = InverseOperator::from_dense(matrix.as_ref()).unwrap();
        let x = dense_inv.solve(b.as_ref()).unwrap();
        assert!((&x - &vector).norm_l2() < 1e-12);

        let sparse_inv =
            InverseOperator::from_sparse(&sparse::from_dense(matrix.as_ref()).unwrap()).unwrap();
        let x = sparse_inv.solve(b.as_ref()).unwrap();
        assert!((&x - &vector).norm_l2() < 1e-12);

        let bh = matrix.adjoint() * &vector;
        let xh = dense_inv.solve_adjoint(bh.as_ref()).unwrap();
        assert!((&xh - &vector).norm_l2() < 1e-12);
    }

    #[test]
    fn test_inverse_operator_rejects_non_square() {
        let rect = Mat::<c64>::zeros(2, 3);
        let err = InverseOperator::from_dense(rect.as_ref()).err().unwrap();
        assert_eq!(
            *err.kind(),
            OperatorErrorKind::NonSquare { nrows: 2, ncols: 3 }
        );
    }

    #[test]
    #[should_panic(
        expected = "Dimension mismatch: operator columns (2) do not match vector rows (3)."
    )]
    fn test_dimension_mismatch_panic() {
        let matrix = Mat::<c64>::identity(2, 2);
        let vector = Mat::<c64>::zeros(3, 1);
        let operator: &dyn LinearOperator = &matrix;
        operator.apply(vector.as_ref());
    }
}
