//! The operator value consumed by the eigensolver, the condition estimator and the
//! matrix exponential.
//!
//! An [`Operator`] couples a matrix, stored either densely or sparsely, with a kind
//! tag ([`OperatorKind`]) and a Hermitian flag. It is immutable: every routine in the
//! crate is a pure function of an operator and explicit parameters.

use crate::{
    error::OperatorError,
    matrix::LinearOperator,
    sparse::{self, SparseMatrix},
};
use faer::{Mat, c64, sparse::Triplet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default absolute tolerance used by [`Operator::detect_hermitian`].
pub const HERMITIAN_TOLERANCE: f64 = 1e-12;

/// Distinguishes vector-like operands from matrix-like ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    /// Column vector.
    Ket,
    /// Row vector.
    Bra,
    /// Square operator acting on states.
    Oper,
    /// Operator acting on operators.
    Super,
}

impl OperatorKind {
    /// Infers the kind from a shape: single columns are kets, single rows are bras.
    pub fn from_shape(nrows: usize, ncols: usize) -> Self {
        match (nrows, ncols) {
            (r, 1) if r > 1 => Self::Ket,
            (1, c) if c > 1 => Self::Bra,
            _ => Self::Oper,
        }
    }

    /// True for kets and bras.
    pub fn is_vector_like(self) -> bool {
        matches!(self, Self::Ket | Self::Bra)
    }

    /// The kind of the conjugate transpose.
    pub fn dual(self) -> Self {
        match self {
            Self::Ket => Self::Bra,
            Self::Bra => Self::Ket,
            other => other,
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ket => "ket",
            Self::Bra => "bra",
            Self::Oper => "oper",
            Self::Super => "super",
        };
        f.write_str(name)
    }
}

/// Storage representation of an operator's matrix.
#[derive(Debug, Clone)]
pub enum Storage {
    Dense(Mat<c64>),
    Sparse(SparseMatrix),
}

/// A matrix together with its kind tag and Hermitian flag.
#[derive(Debug, Clone)]
pub struct Operator {
    storage: Storage,
    kind: OperatorKind,
    isherm: bool,
}

impl Operator {
    /// Wraps a dense matrix. The kind is inferred from the shape and the Hermitian
    /// flag is detected with [`HERMITIAN_TOLERANCE`].
    pub fn dense(matrix: Mat<c64>) -> Self {
        let kind = OperatorKind::from_shape(matrix.nrows(), matrix.ncols());
        let mut op = Self {
            storage: Storage::Dense(matrix),
            kind,
            isherm: false,
        };
        op.isherm = op.detect_hermitian(HERMITIAN_TOLERANCE);
        op
    }

    /// Wraps a sparse matrix, inferring kind and Hermitian flag as [`Operator::dense`] does.
    pub fn sparse(matrix: SparseMatrix) -> Self {
        let kind = OperatorKind::from_shape(matrix.nrows(), matrix.ncols());
        let mut op = Self {
            storage: Storage::Sparse(matrix),
            kind,
            isherm: false,
        };
        op.isherm = op.detect_hermitian(HERMITIAN_TOLERANCE);
        op
    }

    /// Builds a sparse operator from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[Triplet<usize, usize, c64>],
    ) -> Result<Self, OperatorError> {
        Ok(Self::sparse(sparse::from_triplets(nrows, ncols, triplets)?))
    }

    /// Builds a diagonal sparse operator.
    pub fn diagonal(values: &[c64]) -> Self {
        let triplets: Vec<_> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.re != 0.0 || v.im != 0.0)
            .map(|(i, &val)| Triplet { row: i, col: i, val })
            .collect();
        let n = values.len();
        Self::sparse(
            faer::sparse::SparseColMat::try_new_from_triplets(n, n, &triplets)
                .unwrap_or_else(|_| unreachable!("diagonal triplets are valid")),
        )
    }

    /// Overrides the kind tag.
    pub fn with_kind(mut self, kind: OperatorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Overrides the Hermitian flag.
    pub fn with_hermitian(mut self, isherm: bool) -> Self {
        self.isherm = isherm;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn isherm(&self) -> bool {
        self.isherm
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, Storage::Sparse(_))
    }

    pub fn nrows(&self) -> usize {
        match &self.storage {
            Storage::Dense(m) => m.nrows(),
            Storage::Sparse(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match &self.storage {
            Storage::Dense(m) => m.ncols(),
            Storage::Sparse(m) => m.ncols(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Dense materialization of the matrix.
    pub fn full(&self) -> Mat<c64> {
        match &self.storage {
            Storage::Dense(m) => m.clone(),
            Storage::Sparse(m) => sparse::to_dense(m),
        }
    }

    /// Sparse representation of the matrix; dense storage is converted, dropping zeros.
    pub fn data(&self) -> Result<SparseMatrix, OperatorError> {
        match &self.storage {
            Storage::Dense(m) => sparse::from_dense(m.as_ref()),
            Storage::Sparse(m) => Ok(m.clone()),
        }
    }

    /// The operator as a matrix-free [`LinearOperator`].
    pub fn as_linear_operator(&self) -> &dyn LinearOperator {
        match &self.storage {
            Storage::Dense(m) => m,
            Storage::Sparse(m) => m,
        }
    }

    /// Conjugate transpose, keeping the storage representation.
    pub fn dag(&self) -> Result<Self, OperatorError> {
        let storage = match &self.storage {
            Storage::Dense(m) => Storage::Dense(m.adjoint().to_owned()),
            Storage::Sparse(m) => Storage::Sparse(sparse::adjoint(m)?),
        };
        Ok(Self {
            storage,
            kind: self.kind.dual(),
            isherm: self.isherm,
        })
    }

    /// Checks `A == A^H` entrywise within an absolute tolerance.
    ///
    /// Sparse operators are compared through their stored entries and never densified.
    pub fn detect_hermitian(&self, tol: f64) -> bool {
        if self.nrows() != self.ncols() {
            return false;
        }
        let defect = match &self.storage {
            Storage::Dense(m) => Ok((m.as_ref() - m.adjoint()).norm_max()),
            Storage::Sparse(m) => sparse::hermitian_defect(m),
        };
        match defect {
            Ok(defect) => defect <= tol,
            Err(e) => {
                log::warn!("Hermitian check failed, treating the operator as general: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> c64 {
        c64::new(re, im)
    }

    #[test]
    fn test_kind_inferred_from_shape() {
        assert_eq!(OperatorKind::from_shape(4, 1), OperatorKind::Ket);
        assert_eq!(OperatorKind::from_shape(1, 4), OperatorKind::Bra);
        assert_eq!(OperatorKind::from_shape(4, 4), OperatorKind::Oper);
        assert_eq!(OperatorKind::from_shape(1, 1), OperatorKind::Oper);
        assert_eq!(OperatorKind::Ket.to_string(), "ket");
    }

    #[test]
    fn test_hermitian_detection() {
        // Pauli Y is Hermitian, Pauli Y times i is not.
        let y = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 1) => c(0.0, -1.0),
            (1, 0) => c(0.0, 1.0),
            _ => c(0.0, 0.0),
        });
        let op = Operator::dense(y.clone());
        assert!(op.isherm());
        assert_eq!(op.kind(), OperatorKind::Oper);

        let iy = Mat::from_fn(2, 2, |i, j| y[(i, j)] * c(0.0, 1.0));
        assert!(!Operator::dense(iy).isherm());

        let sparse_op = Operator::sparse(sparse::from_dense(y.as_ref()).unwrap());
        assert!(sparse_op.isherm());
        assert!(sparse_op.is_sparse());
    }

    #[test]
    fn test_large_sparse_hermitian_detection_stays_sparse() {
        // A dense copy of this operator would need 10^10 entries.
        let n = 100_000;
        let mut triplets = Vec::with_capacity(3 * n);
        for i in 0..n {
            triplets.push(Triplet { row: i, col: i, val: c(2.0, 0.0) });
            if i + 1 < n {
                triplets.push(Triplet { row: i, col: i + 1, val: c(-1.0, 0.5) });
                triplets.push(Triplet { row: i + 1, col: i, val: c(-1.0, -0.5) });
            }
        }
        let op = Operator::sparse(sparse::from_triplets(n, n, &triplets).unwrap());
        assert!(op.isherm());

        triplets.push(Triplet { row: 0, col: n - 1, val: c(1e-6, 0.0) });
        let skewed = Operator::sparse(sparse::from_triplets(n, n, &triplets).unwrap());
        assert!(!skewed.isherm());
        assert!(skewed.detect_hermitian(1e-5));
    }

    #[test]
    fn test_dag_swaps_ket_and_bra() {
        let ket = Operator::dense(Mat::from_fn(3, 1, |i, _| c(i as f64, 1.0)));
        assert_eq!(ket.kind(), OperatorKind::Ket);
        let bra = ket.dag().unwrap();
        assert_eq!(bra.kind(), OperatorKind::Bra);
        assert_eq!(bra.shape(), (1, 3));
        assert_eq!(bra.full()[(0, 2)], c(2.0, -1.0));
    }

    #[test]
    fn test_full_and_data_agree() {
        let op = Operator::diagonal(&[c(1.0, 0.0), c(0.0, 0.0), c(-2.0, 0.5)]);
        assert_eq!(op.shape(), (3, 3));
        let data = op.data().unwrap();
        assert_eq!(data.as_ref().compute_nnz(), 2);
        assert_eq!(op.full()[(2, 2)], c(-2.0, 0.5));
        assert!(!op.isherm());
    }
}
