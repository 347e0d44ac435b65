//! Arnoldi eigensolver for non-Hermitian operators.
//!
//! The projected matrix `H_m` is a general upper Hessenberg matrix. Its eigenpairs,
//! computed with faer's general eigendecomposition, give Ritz values ranked by their
//! real part: the smallest or largest `k` are kept, matching the `SR` and `LR`
//! selectors of classic implicitly restarted solvers. Restarts keep an orthonormal
//! basis of the wanted Ritz vectors, obtained from a thin QR factorization.

use super::{
    Cycle, KrylovBasis, KrylovParams, RitzPairs, Which, convergence_threshold, solve_restarted,
    subspace_dimension,
};
use crate::{error::OperatorError, matrix::LinearOperator, matrix::ensure_square};
use faer::{Mat, c64};
use std::cmp::Ordering;

/// Orders complex numbers by real part, then imaginary part.
pub(crate) fn cmp_real_then_imag(a: &c64, b: &c64) -> Ordering {
    a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im))
}

fn select(
    basis: &KrylovBasis<'_>,
    k: usize,
    keep: usize,
    which: Which,
    tol: f64,
) -> Result<Cycle<c64>, OperatorError> {
    let m = basis.steps();
    let evd = basis.projected().eigen()?;
    let s = evd.S();
    let u = evd.U();

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| cmp_real_then_imag(&s[a], &s[b]));
    let chosen: Vec<usize> = match which {
        Which::Smallest => order.into_iter().take(keep).collect(),
        Which::Largest => order.into_iter().rev().take(keep).collect(),
    };

    let norms: Vec<f64> = chosen.iter().map(|&i| u.col(i).norm_l2()).collect();
    let y = Mat::from_fn(m, chosen.len(), |l, col| u[(l, chosen[col])] / norms[col]);
    let residuals = basis.residuals(y.as_ref());
    let converged = chosen
        .iter()
        .zip(&residuals)
        .take(k)
        .filter(|&(&i, &r)| r <= convergence_threshold(tol, s[i].norm()))
        .count();

    // Eigenvectors of a non-normal projection are not orthogonal; restart on their span.
    let kept = y.qr().compute_thin_Q();
    Ok(Cycle {
        values: chosen.iter().map(|&i| s[i]).collect(),
        y,
        kept,
        converged,
    })
}

/// Computes the `k` eigenpairs with smallest or largest real part of a general operator.
///
/// Values are ordered from the most extreme inwards. Eigenvectors, when requested,
/// are normalized Ritz vectors.
pub fn arnoldi_extreme(
    operator: &dyn LinearOperator,
    k: usize,
    which: Which,
    want_vectors: bool,
    params: &KrylovParams,
) -> Result<RitzPairs<c64>, OperatorError> {
    ensure_square(operator.nrows(), operator.ncols())?;
    let n = operator.nrows();
    if k == 0 {
        return Ok(RitzPairs {
            values: Vec::new(),
            vectors: want_vectors.then(|| Mat::zeros(n, 0)),
        });
    }

    let tol = params.effective_tol();
    let mut basis = KrylovBasis::new(operator, subspace_dimension(k, n));
    let cycle = solve_restarted(&mut basis, k, params, |b, keep| select(b, k, keep, which, tol))?;

    let vectors = want_vectors.then(|| basis.ritz_vectors(cycle.y.as_ref().get(.., 0..k)));
    Ok(RitzPairs {
        values: cycle.values.into_iter().take(k).collect(),
        vectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Upper triangular, so the eigenvalues are the diagonal entries.
    fn upper_triangular(n: usize) -> Mat<c64> {
        Mat::from_fn(n, n, |i, j| {
            if i == j {
                c64::new(i as f64 - 3.0, 0.5 * i as f64)
            } else if j == i + 1 {
                c64::new(0.3, 0.0)
            } else {
                c64::new(0.0, 0.0)
            }
        })
    }

    #[test]
    fn test_real_part_ordering() {
        let a = c64::new(1.0, 5.0);
        let b = c64::new(1.0, -1.0);
        let c = c64::new(-2.0, 9.0);
        assert_eq!(cmp_real_then_imag(&a, &b), Ordering::Greater);
        assert_eq!(cmp_real_then_imag(&c, &b), Ordering::Less);
    }

    #[test]
    fn test_extreme_real_parts() {
        let a = upper_triangular(30);
        let params = KrylovParams { tol: 1e-12, max_iter: 10_000 };

        let low = arnoldi_extreme(&a, 2, Which::Smallest, false, &params).unwrap();
        assert!((low.values[0] - c64::new(-3.0, 0.0)).norm() < 1e-8);
        assert!((low.values[1] - c64::new(-2.0, 0.5)).norm() < 1e-8);

        let high = arnoldi_extreme(&a, 1, Which::Largest, true, &params).unwrap();
        assert!((high.values[0] - c64::new(26.0, 14.5)).norm() < 1e-8);

        let x = high.vectors.unwrap();
        let av = &a * &x;
        let residual = &av - &Mat::from_fn(30, 1, |i, _| x[(i, 0)] * high.values[0]);
        assert!(residual.norm_l2() < 1e-6);
    }
}
