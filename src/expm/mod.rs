//! Matrix exponential by scaling and squaring with diagonal Pade approximants.
//!
//! The one-norm of `A` picks the cheapest Pade order that is accurate to double
//! precision ([`ScalingDecision::select`]). Above the order-13 threshold, `A` is
//! scaled by `2^-s` so that its norm falls below it, the order-13 approximant is
//! evaluated, and the result is squared `s` times.

pub mod pade;

use crate::{
    error::{OperatorError, OperatorErrorKind},
    matrix::ensure_square,
    norms::sparse_one_norm,
    operator::Operator,
    sparse::{self, SparseMatrix},
};
use faer::c64;
use pade::{PADE_ORDERS, THETA};

/// Pade order and number of squarings chosen for a given one-norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingDecision {
    pub order: usize,
    pub squarings: u32,
}

impl ScalingDecision {
    /// Selects the order and scaling for a finite, non-negative one-norm.
    pub fn select(norm: f64) -> Self {
        if let Some(i) = THETA.iter().position(|&theta| norm <= theta) {
            return Self {
                order: PADE_ORDERS[i],
                squarings: 0,
            };
        }
        let (t, mut s) = frexp(norm / THETA[THETA.len() - 1]);
        if t == 0.5 {
            s -= 1;
        }
        Self {
            order: 13,
            squarings: s.max(0) as u32,
        }
    }
}

/// Splits a positive normal `x` into `t * 2^e` with `t` in `[0.5, 1)`.
fn frexp(x: f64) -> (f64, i32) {
    const EXP_MASK: u64 = 0x7ff << 52;
    let bits = x.to_bits();
    let e = ((bits & EXP_MASK) >> 52) as i32 - 1022;
    let t = f64::from_bits((bits & !EXP_MASK) | (1022u64 << 52));
    (t, e)
}

/// Exponential of a raw square sparse matrix.
pub fn expm_sparse(a: &SparseMatrix) -> Result<SparseMatrix, OperatorError> {
    ensure_square(a.nrows(), a.ncols())?;
    let norm = sparse_one_norm(a);
    if !norm.is_finite() {
        return Err(OperatorErrorKind::InputError(format!(
            "cannot exponentiate a matrix with one-norm {norm}"
        ))
        .into());
    }

    let decision = ScalingDecision::select(norm);
    log::debug!(
        "expm: |A|_1 = {norm:e}, Pade order {}, {} squarings.",
        decision.order,
        decision.squarings
    );

    if decision.squarings == 0 {
        return pade::evaluate(a, decision.order);
    }
    let scale = 2f64.powi(-(decision.squarings as i32));
    let scaled = sparse::scale(a, c64::new(scale, 0.0));
    let mut f = pade::evaluate(&scaled, decision.order)?;
    for _ in 0..decision.squarings {
        f = sparse::matmul(&f, &f);
    }
    Ok(f)
}

/// Exponential of an operator, returned in sparse storage.
///
/// # Errors
/// * [`OperatorErrorKind::NonSquare`] for rectangular operators.
/// * [`OperatorErrorKind::SingularSystem`] when the Pade denominator is singular.
pub fn matrix_exponential(op: &Operator) -> Result<SparseMatrix, OperatorError> {
    ensure_square(op.nrows(), op.ncols())?;
    expm_sparse(&op.data()?)
}

impl Operator {
    /// The exponential as a sparse operator of the same kind.
    pub fn expm(&self) -> Result<Operator, OperatorError> {
        Ok(Operator::sparse(matrix_exponential(self)?).with_kind(self.kind()))
    }
}
