//! Diagonal Pade approximants `r_m(A) = (V - U)^{-1} (V + U)` of `exp(A)`.
//!
//! `U` collects the odd-degree terms and `V` the even-degree terms of the numerator
//! polynomial `p_m(A) = sum_j c_j A^j`. Orders 3 to 9 build the even powers in a
//! loop; order 13 uses the fixed `A^2, A^4, A^6` factorization. All products stay
//! sparse; only the final solve is dense.

use crate::{
    error::{OperatorError, OperatorErrorKind},
    matrix::ensure_square,
    sparse::{self, SparseMatrix},
};
use faer::{Mat, c64, prelude::*};

pub const PADE_ORDERS: [usize; 5] = [3, 5, 7, 9, 13];

/// Largest one-norm for which order `PADE_ORDERS[i]` is accurate to double precision.
pub const THETA: [f64; 5] = [
    0.01495585217958292,
    0.2539398330063230,
    0.9504178996162932,
    2.097847961257068,
    5.371920351148152,
];

const PADE_3: [f64; 4] = [120.0, 60.0, 12.0, 1.0];
const PADE_5: [f64; 6] = [30240.0, 15120.0, 3360.0, 420.0, 30.0, 1.0];
const PADE_7: [f64; 8] = [
    17297280.0, 8648640.0, 1995840.0, 277200.0, 25200.0, 1512.0, 56.0, 1.0,
];
const PADE_9: [f64; 10] = [
    17643225600.0,
    8821612800.0,
    2075673600.0,
    302702400.0,
    30270240.0,
    2162160.0,
    110880.0,
    3960.0,
    90.0,
    1.0,
];
const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Numerator coefficients `c_0, ..., c_m` for one of [`PADE_ORDERS`].
///
/// # Errors
/// [`OperatorErrorKind::InputError`] for any other order.
pub fn coefficients(order: usize) -> Result<&'static [f64], OperatorError> {
    match order {
        3 => Ok(&PADE_3),
        5 => Ok(&PADE_5),
        7 => Ok(&PADE_7),
        9 => Ok(&PADE_9),
        13 => Ok(&PADE_13),
        other => Err(OperatorErrorKind::InputError(format!(
            "unsupported Pade order {other}, expected one of {PADE_ORDERS:?}"
        ))
        .into()),
    }
}

fn real(x: f64) -> c64 {
    c64::new(x, 0.0)
}

/// Returns `(U, V)` by accumulating even powers; `c` holds `c_0, ..., c_m` with odd `m`.
fn odd_even_parts(a: &SparseMatrix, c: &[f64]) -> (SparseMatrix, SparseMatrix) {
    let n = a.nrows();
    let order = c.len() - 1;
    let a2 = sparse::matmul(a, a);

    // powers[k] = A^(2k), up to A^(order - 1).
    let mut powers = vec![sparse::identity(n), a2];
    for _ in 2..order.div_ceil(2) {
        let next = sparse::matmul(&powers[powers.len() - 1], &powers[1]);
        powers.push(next);
    }

    let odd: Vec<_> = (1..=order)
        .step_by(2)
        .map(|j| (real(c[j]), &powers[j / 2]))
        .collect();
    let u = sparse::matmul(a, &sparse::linear_combination(n, n, &odd));

    let even: Vec<_> = (0..order)
        .step_by(2)
        .map(|j| (real(c[j]), &powers[j / 2]))
        .collect();
    let v = sparse::linear_combination(n, n, &even);
    (u, v)
}

/// Returns `(U, V)` for order 13.
fn odd_even_parts_13(a: &SparseMatrix) -> (SparseMatrix, SparseMatrix) {
    let n = a.nrows();
    let c = &PADE_13;
    let id = sparse::identity(n);
    let a2 = sparse::matmul(a, a);
    let a4 = sparse::matmul(&a2, &a2);
    let a6 = sparse::matmul(&a2, &a4);

    let inner_u = sparse::linear_combination(
        n,
        n,
        &[(real(c[13]), &a6), (real(c[11]), &a4), (real(c[9]), &a2)],
    );
    let high_u = sparse::matmul(&a6, &inner_u);
    let u = sparse::matmul(
        a,
        &sparse::linear_combination(
            n,
            n,
            &[
                (real(1.0), &high_u),
                (real(c[7]), &a6),
                (real(c[5]), &a4),
                (real(c[3]), &a2),
                (real(c[1]), &id),
            ],
        ),
    );

    let inner_v = sparse::linear_combination(
        n,
        n,
        &[(real(c[12]), &a6), (real(c[10]), &a4), (real(c[8]), &a2)],
    );
    let high_v = sparse::matmul(&a6, &inner_v);
    let v = sparse::linear_combination(
        n,
        n,
        &[
            (real(1.0), &high_v),
            (real(c[6]), &a6),
            (real(c[4]), &a4),
            (real(c[2]), &a2),
            (real(c[0]), &id),
        ],
    );
    (u, v)
}

/// Evaluates the order-`order` Pade approximant of `exp(A)`.
///
/// # Errors
/// * [`OperatorErrorKind::NonSquare`] for rectangular input.
/// * [`OperatorErrorKind::InputError`] when `order` is not one of [`PADE_ORDERS`].
/// * [`OperatorErrorKind::SingularSystem`] when `V - U` is singular to working precision.
pub fn evaluate(a: &SparseMatrix, order: usize) -> Result<SparseMatrix, OperatorError> {
    ensure_square(a.nrows(), a.ncols())?;
    let c = coefficients(order)?;
    let n = a.nrows();
    let (u, v) = if order == 13 {
        odd_even_parts_13(a)
    } else {
        odd_even_parts(a, c)
    };

    let q = sparse::to_dense(&sparse::linear_combination(
        n,
        n,
        &[(real(1.0), &v), (real(-1.0), &u)],
    ));
    let p = sparse::to_dense(&sparse::linear_combination(
        n,
        n,
        &[(real(1.0), &v), (real(1.0), &u)],
    ));
    let f = solve_denominator(q, p)?;
    sparse::from_dense(f.as_ref())
}

/// Solves `Q F = P` by partial-pivot LU, rejecting a zero or tiny pivot of `U`.
fn solve_denominator(q: Mat<c64>, p: Mat<c64>) -> Result<Mat<c64>, OperatorError> {
    let singular = || -> OperatorError {
        OperatorErrorKind::SingularSystem {
            context: "solving the Pade system (V - U) F = V + U",
        }
        .into()
    };
    let n = q.nrows();
    let lu = q.partial_piv_lu();
    let pivots = lu.U().diagonal().column_vector();
    let (smallest, largest) = pivots
        .iter()
        .map(|z| z.norm())
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if n > 0 && smallest <= n as f64 * f64::EPSILON * largest {
        return Err(singular());
    }
    let f = lu.solve(p.as_ref());
    if !f.is_all_finite() {
        return Err(singular());
    }
    Ok(f)
}
