//! This module defines the custom error types for the library.
//!
//! Every failure that the eigensolver dispatcher, the condition estimator, the
//! matrix exponential or the norm helpers can produce is collected into a single
//! public error type, [`OperatorError`], which wraps an [`OperatorErrorKind`].
//!
//! Using the [`thiserror`] crate allows us to create idiomatic error types with minimal
//! boilerplate. Note that [`faer::linalg::evd::EvdError`] does not implement the standard
//! [`std::error::Error`] trait, so we wrap it manually to provide a compatible error type.
use crate::operator::OperatorKind;
use thiserror::Error;

/// Represents all possible errors raised by the operator routines.
///
/// The variant can be inspected through [`OperatorError::kind`], and the coarse
/// failure class through [`OperatorError::category`].
#[derive(Error, Debug)]
#[error(transparent)]
pub struct OperatorError(#[from] OperatorErrorKind);

/// The distinct kinds of errors.
#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum OperatorErrorKind {
    /// A vector-like operand was passed where a matrix-like operator is required,
    /// or the reverse.
    #[error("Invalid operator type: {operation} is not defined for {kind} operands.")]
    InvalidOperatorType {
        operation: &'static str,
        kind: OperatorKind,
    },

    /// More eigenpairs were requested than the operator dimension allows.
    #[error("Number of requested eigenpairs ({requested}) must be <= the dimension {dim}.")]
    TooManyEigenpairs { requested: usize, dim: usize },

    /// The sort order string was neither `low` nor `high`.
    #[error("Invalid sort order '{0}': expected 'low' or 'high'.")]
    InvalidSortOrder(String),

    /// Indicates that an invalid input parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InputError(String),

    /// The routine requires a square operator.
    #[error("Operator must be square, got {nrows}x{ncols}.")]
    NonSquare { nrows: usize, ncols: usize },

    /// Indicates that the dimensions of an operator and its argument are
    /// incompatible for a product.
    #[error(
        "Dimension mismatch: operator has {operator_cols} columns but vector has {vector_rows} rows."
    )]
    DimensionMismatch {
        operator_cols: usize,
        vector_rows: usize,
    },

    /// A reshape changed the total number of elements.
    #[error(
        "Cannot reshape a {from_rows}x{from_cols} matrix into {to_rows}x{to_cols}: total size must be unchanged."
    )]
    ReshapeSizeMismatch {
        from_rows: usize,
        from_cols: usize,
        to_rows: usize,
        to_cols: usize,
    },

    /// A sparse matrix could not be assembled from its triplets.
    #[error("Failed to construct sparse matrix: {0}")]
    SparseConstruction(String),

    /// A linear system met during Pade evaluation (or an LU factorization) is singular.
    #[error("Singular linear system encountered while {context}.")]
    SingularSystem { context: &'static str },

    /// The iterative eigensolver did not converge within its operator application budget.
    #[error(
        "Iterative eigensolver converged {converged} of {requested} eigenpairs within {iterations} operator applications."
    )]
    NoConvergence {
        converged: usize,
        requested: usize,
        iterations: usize,
    },

    /// The one-norm estimator hit its iteration cap.
    #[error("One-norm estimation did not settle within {iterations} iterations.")]
    ConditionEstimateStalled { iterations: usize },

    /// Wraps an error originating from [`faer`]'s eigendecomposition module.
    #[error("A numerical error occurred during eigendecomposition: {0:?}")]
    EvdError(faer::linalg::evd::EvdError),
}

/// Coarse failure classes shared by every routine in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Diagonalization or a norm was requested on the wrong kind of operand.
    InvalidOperatorType,
    /// The request itself is malformed (counts, sort strings, parameters).
    InvalidRequest,
    /// Singular solves, non-convergence and decomposition failures.
    NumericalFailure,
    /// Inconsistent shapes.
    ShapeMismatch,
}

impl OperatorError {
    /// Returns the specific kind of this error.
    pub fn kind(&self) -> &OperatorErrorKind {
        &self.0
    }

    /// Returns the failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        use OperatorErrorKind::*;
        match &self.0 {
            InvalidOperatorType { .. } => ErrorCategory::InvalidOperatorType,
            TooManyEigenpairs { .. } | InvalidSortOrder(_) | InputError(_) => {
                ErrorCategory::InvalidRequest
            }
            SingularSystem { .. }
            | NoConvergence { .. }
            | ConditionEstimateStalled { .. }
            | EvdError(_) => ErrorCategory::NumericalFailure,
            NonSquare { .. }
            | DimensionMismatch { .. }
            | ReshapeSizeMismatch { .. }
            | SparseConstruction(_) => ErrorCategory::ShapeMismatch,
        }
    }
}

impl From<faer::linalg::evd::EvdError> for OperatorError {
    fn from(err: faer::linalg::evd::EvdError) -> Self {
        OperatorErrorKind::EvdError(err).into()
    }
}

// Manually implement PartialEq for the public error type.
// We compare the inner `OperatorErrorKind`.
impl PartialEq for OperatorError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
