//! One-norm condition number estimation.
//!
//! [`estimate_one_norm`] is Hager's iteration: starting from the unit vector `e_0`, it
//! alternates `u = A v` and `x = A^H sign(u)`, and moves the unit entry to the index
//! maximizing `|x|` until `||x||_inf <= ||u||_1`. Only products with `A` and `A^H`
//! are needed, so it runs on any [`LinearOperator`].
//!
//! [`estimate_condition`] combines two such estimates into `||A||_1 * ||A^{-1}||_1`,
//! applying the inverse through an LU-backed [`InverseOperator`].

use crate::{
    error::{OperatorError, OperatorErrorKind},
    matrix::{InverseOperator, LinearOperator, ensure_square},
    operator::{Operator, Storage},
};
use faer::{Mat, c64};

/// Iteration cap used by [`estimate_condition`].
pub const DEFAULT_CONDEST_MAX_ITER: usize = 100;

/// Complex sign `z / |z|`, with `sign(0) = 0`.
fn sign(z: c64) -> c64 {
    let r = z.norm();
    if r == 0.0 { c64::new(0.0, 0.0) } else { z / r }
}

/// Index and value of the first entry of largest modulus.
fn first_argmax(x: &Mat<c64>) -> (usize, f64) {
    let mut best = (0, 0.0f64);
    for i in 0..x.nrows() {
        let a = x[(i, 0)].norm();
        if a > best.1 {
            best = (i, a);
        }
    }
    best
}

/// Estimates `||A||_1` by Hager's iteration.
///
/// # Arguments
/// * `operator`: A square linear operator.
/// * `max_iter`: Maximum number of unit-vector updates.
///
/// # Returns
/// A lower bound on the one-norm, exact for many small and nonnegative matrices.
/// A non-finite product (for instance the inverse of a singular matrix) gives
/// `f64::INFINITY`.
///
/// # Errors
/// [`OperatorErrorKind::NonSquare`] for rectangular operators and
/// [`OperatorErrorKind::ConditionEstimateStalled`] when `max_iter` is exhausted.
pub fn estimate_one_norm<L>(operator: &L, max_iter: usize) -> Result<f64, OperatorError>
where
    L: LinearOperator + ?Sized,
{
    ensure_square(operator.nrows(), operator.ncols())?;
    let n = operator.nrows();
    if n == 0 {
        return Ok(0.0);
    }

    let mut unit = 0;
    for iteration in 1..=max_iter {
        let v = Mat::from_fn(n, 1, |i, _| {
            if i == unit { c64::new(1.0, 0.0) } else { c64::new(0.0, 0.0) }
        });
        let u = operator.apply(v.as_ref());
        if !u.is_all_finite() {
            return Ok(f64::INFINITY);
        }
        let unrm: f64 = (0..n).map(|i| u[(i, 0)].norm()).sum();

        let w = Mat::from_fn(n, 1, |i, _| sign(u[(i, 0)]));
        let x = operator.adjoint_apply(w.as_ref());
        if !x.is_all_finite() {
            return Ok(f64::INFINITY);
        }
        let (new_ind, xnrm) = first_argmax(&x);
        log::trace!(
            "condest iteration {iteration}: unit {unit}, |u|_1 = {unrm:e}, |x|_inf = {xnrm:e}"
        );

        if xnrm <= unrm || new_ind == unit {
            return Ok(unrm);
        }
        unit = new_ind;
    }

    log::warn!("One-norm estimate did not settle after {max_iter} iterations.");
    Err(OperatorErrorKind::ConditionEstimateStalled {
        iterations: max_iter,
    }
    .into())
}

/// Estimates the one-norm condition number `||A||_1 * ||A^{-1}||_1` of an operator.
///
/// Singular operators yield `f64::INFINITY`.
pub fn estimate_condition(op: &Operator) -> Result<f64, OperatorError> {
    ensure_square(op.nrows(), op.ncols())?;
    let norm = estimate_one_norm(op.as_linear_operator(), DEFAULT_CONDEST_MAX_ITER)?;

    let inverse = match op.storage() {
        Storage::Dense(m) => InverseOperator::from_dense(m.as_ref()),
        Storage::Sparse(m) => InverseOperator::from_sparse(m),
    };
    let inverse = match inverse {
        Ok(inverse) => inverse,
        Err(err) if matches!(err.kind(), OperatorErrorKind::SingularSystem { .. }) => {
            log::debug!("Operator is singular: {err}");
            return Ok(f64::INFINITY);
        }
        Err(err) => return Err(err),
    };

    let inverse_norm = estimate_one_norm(&inverse, DEFAULT_CONDEST_MAX_ITER)?;
    if inverse_norm.is_infinite() {
        return Ok(f64::INFINITY);
    }
    log::debug!("condest: |A|_1 ~ {norm:e}, |A^-1|_1 ~ {inverse_norm:e}");
    Ok(norm * inverse_norm)
}

impl Operator {
    /// One-norm condition number estimate; see [`estimate_condition`].
    pub fn condest(&self) -> Result<f64, OperatorError> {
        estimate_condition(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norms::one_norm;

    fn real(rows: &[&[f64]]) -> Mat<c64> {
        Mat::from_fn(rows.len(), rows[0].len(), |i, j| c64::new(rows[i][j], 0.0))
    }

    #[test]
    fn test_sign_of_complex_entries() {
        assert_eq!(sign(c64::new(0.0, 0.0)), c64::new(0.0, 0.0));
        let s = sign(c64::new(3.0, -4.0));
        assert!((s - c64::new(0.6, -0.8)).norm() < 1e-15);
    }

    #[test]
    fn test_one_norm_estimate_is_exact_for_positive_matrix() {
        // The largest column sum is in column 2, so the unit entry has to move.
        let a = real(&[&[1.0, 2.0, 3.0], &[1.0, 0.5, 4.0], &[0.5, 1.0, 2.0]]);
        let estimate = estimate_one_norm(&a, 10).unwrap();
        assert!((estimate - 9.0).abs() < 1e-12);
        let exact = one_norm(&Operator::dense(a));
        assert!((estimate - exact).abs() < 1e-12);
    }

    #[test]
    fn test_one_norm_estimate_is_a_lower_bound() {
        // e_0 is a local maximum here, so the larger column is never visited.
        let a = real(&[&[1.0, 0.0, 0.0], &[0.0, -5.0, 0.0], &[0.0, 0.0, 2.0]]);
        let estimate = estimate_one_norm(&a, 10).unwrap();
        assert!((estimate - 1.0).abs() < 1e-12);
        assert!(estimate <= one_norm(&Operator::dense(a)));
    }

    #[test]
    fn test_zero_iteration_budget_stalls() {
        let a = real(&[&[1.0, 0.0], &[0.0, 2.0]]);
        let err = estimate_one_norm(&a, 0).unwrap_err();
        assert_eq!(
            *err.kind(),
            OperatorErrorKind::ConditionEstimateStalled { iterations: 0 }
        );
    }

    #[test]
    fn test_condition_of_identity_and_singular() {
        let id = Operator::dense(Mat::identity(4, 4));
        assert!((estimate_condition(&id).unwrap() - 1.0).abs() < 1e-12);

        let singular = Operator::dense(real(&[
            &[1.0, 0.0, 0.0],
            &[0.0, 0.0, 0.0],
            &[0.0, 0.0, 2.0],
        ]));
        assert_eq!(singular.condest().unwrap(), f64::INFINITY);

        let sparse_singular = Operator::sparse(singular.data().unwrap());
        assert_eq!(estimate_condition(&sparse_singular).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_condition_of_well_conditioned_matrix() {
        // cond_1([[2, 1], [1, 2]]) = 3 * 1.
        let op = Operator::dense(real(&[&[2.0, 1.0], &[1.0, 2.0]]));
        assert!((estimate_condition(&op).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rectangular_is_rejected() {
        let op = Operator::dense(Mat::zeros(2, 3));
        let err = estimate_condition(&op).unwrap_err();
        assert_eq!(*err.kind(), OperatorErrorKind::NonSquare { nrows: 2, ncols: 3 });
    }
}
