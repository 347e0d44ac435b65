//! Matrix-algebra primitives for quantum operators stored densely or sparsely.
//!
//! This crate provides three independent routines on an [`Operator`], a complex
//! matrix tagged with its kind (ket, bra, operator, superoperator) and a Hermitian
//! flag:
//!
//! - **Eigensolver dispatcher** ([`eigensolve`]): one interface over four algorithms,
//!   selected from the requested storage path and the Hermitian flag. Dense requests
//!   use faer's eigendecompositions; sparse requests run a Lanczos (Hermitian) or
//!   Arnoldi (general) Krylov solver on the matrix-free [`LinearOperator`] view.
//!   Results are always globally ordered and paired with their eigenvectors.
//! - **Condition estimator** ([`estimate_condition`]): Hager's one-norm iteration
//!   applied to `A` and, through an LU factorization, to `A^{-1}`.
//! - **Matrix exponential** ([`matrix_exponential`]): scaling and squaring with
//!   diagonal Pade approximants of order 3 to 13, chosen from the one-norm.
//!
//! Built on the [`faer`] linear algebra framework. Every routine is synchronous,
//! single-threaded and a pure function of its inputs.
//!
//! ## Example Usage
//!
//! ```rust
//! use faer::{Mat, c64};
//! use operator_linalg::{EigenOptions, Eigenvalues, Operator, SortOrder, eigenvalues};
//!
//! // Pauli X is Hermitian with eigenvalues -1 and +1.
//! let x = Mat::from_fn(2, 2, |i, j| {
//!     if i != j { c64::new(1.0, 0.0) } else { c64::new(0.0, 0.0) }
//! });
//! let op = Operator::dense(x);
//! assert!(op.isherm());
//!
//! let opts = EigenOptions { sort: SortOrder::High, ..Default::default() };
//! let Eigenvalues::Real(values) = eigenvalues(&op, &opts).unwrap() else {
//!     panic!("Hermitian operators have real eigenvalues");
//! };
//! assert!((values[0] - 1.0).abs() < 1e-12);
//! assert!((values[1] + 1.0).abs() < 1e-12);
//!
//! // exp(i * pi * X / 2) = i * X
//! let theta = c64::new(0.0, std::f64::consts::FRAC_PI_2);
//! let generator = Operator::sparse(operator_linalg::sparse::scale(&op.data().unwrap(), theta));
//! let u = generator.expm().unwrap().full();
//! assert!((u[(0, 1)] - c64::new(0.0, 1.0)).norm() < 1e-12);
//! assert!(u[(0, 0)].norm() < 1e-12);
//! ```

// Declare the modules that form the crate's API structure.
pub mod algorithms;
pub mod condest;
pub mod eigen;
pub mod error;
pub mod expm;
pub mod matrix;
pub mod norms;
pub mod operator;
pub mod sparse;
pub mod utils;

// Re-export the main API for convenient access.
pub use condest::{estimate_condition, estimate_one_norm};
pub use eigen::{
    EigenOptions, EigenStrategy, Eigenvalues, SortOrder, Spectrum, drop_trailing_pair,
    eigensolve, eigenvalues,
};
pub use error::{ErrorCategory, OperatorError, OperatorErrorKind};
pub use expm::{ScalingDecision, expm_sparse, matrix_exponential};
pub use matrix::{InverseOperator, LinearOperator};
pub use operator::{Operator, OperatorKind, Storage};
