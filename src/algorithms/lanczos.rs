//! Hermitian Lanczos eigensolver for algebraically extreme eigenpairs.
//!
//! For a Hermitian operator the projection `H_m = V_m^H A V_m` produced by the
//! shared Krylov process is real symmetric up to rounding. Before the first restart
//! it is tridiagonal: its diagonal holds the Lanczos coefficients `alpha_j` and its
//! subdiagonal the `beta_j`. A thick restart replaces the leading block by the kept
//! Ritz values, coupled to the next Lanczos vector through a row of "spikes", so
//! `T_m` becomes an arrowhead block followed by a tridiagonal one. The solver reads
//! those coefficients into a [`LanczosDecomposition`], assembles `T_m`, and
//! diagonalizes it with faer's self-adjoint eigendecomposition. Ritz values are
//! therefore real by construction.
//!
//! Memory usage scales as O(n * ncv), where ncv is the capped subspace dimension.

use super::{
    Cycle, KrylovBasis, KrylovParams, RitzPairs, Which, convergence_threshold, solve_restarted,
    subspace_dimension,
};
use crate::{error::OperatorError, matrix::LinearOperator, matrix::ensure_square};
use faer::{Mat, Side, c64};

/// The scalar coefficients defining the real symmetric matrix `T_m`.
#[derive(Debug, Clone, PartialEq)]
pub struct LanczosDecomposition {
    /// Diagonal entries `alpha_1, ..., alpha_m`; the first `spikes.len()` are kept Ritz values.
    pub alphas: Vec<f64>,
    /// Coupling of the kept Ritz values to the first Lanczos vector after a restart.
    pub spikes: Vec<f64>,
    /// Off-diagonal entries of the tridiagonal block; a zero marks a restart after breakdown.
    pub betas: Vec<f64>,
}

impl LanczosDecomposition {
    /// Reads the coefficients of a Hermitian projection whose first `locked`
    /// columns come from a thick restart.
    fn from_basis(basis: &KrylovBasis<'_>) -> Self {
        let h = basis.projected();
        let m = h.nrows();
        let p = basis.locked().min(m);
        let alphas = (0..m).map(|i| h[(i, i)].re).collect();
        let spikes = if p < m {
            (0..p).map(|i| h[(p, i)].re).collect()
        } else {
            Vec::new()
        };
        let betas = (p..m.saturating_sub(1)).map(|i| h[(i + 1, i)].re).collect();
        Self { alphas, spikes, betas }
    }

    /// Assembles the dense `m x m` matrix `T_m`.
    pub fn assemble(&self) -> Mat<f64> {
        let steps = self.alphas.len();
        let p = self.spikes.len();
        let mut t_k = Mat::zeros(steps, steps);
        for (i, &alpha) in self.alphas.iter().enumerate() {
            t_k[(i, i)] = alpha;
        }
        for (i, &spike) in self.spikes.iter().enumerate() {
            t_k[(p, i)] = spike;
            t_k[(i, p)] = spike;
        }
        for (i, &beta) in self.betas.iter().enumerate() {
            t_k[(p + i, p + i + 1)] = beta;
            t_k[(p + i + 1, p + i)] = beta;
        }
        t_k
    }
}

fn select(
    basis: &KrylovBasis<'_>,
    k: usize,
    keep: usize,
    which: Which,
    tol: f64,
) -> Result<Cycle<f64>, OperatorError> {
    let m = basis.steps();
    let t_m = LanczosDecomposition::from_basis(basis).assemble();
    let evd = t_m.as_ref().self_adjoint_eigen(Side::Lower)?;
    let s = evd.S();
    let u = evd.U();

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| s[a].total_cmp(&s[b]));
    let chosen: Vec<usize> = match which {
        Which::Smallest => order.into_iter().take(keep).collect(),
        Which::Largest => order.into_iter().rev().take(keep).collect(),
    };
    let y = Mat::from_fn(m, chosen.len(), |l, col| c64::new(u[(l, chosen[col])], 0.0));
    let residuals = basis.residuals(y.as_ref());
    let converged = chosen
        .iter()
        .zip(&residuals)
        .take(k)
        .filter(|&(&i, &r)| r <= convergence_threshold(tol, s[i].abs()))
        .count();

    Ok(Cycle {
        values: chosen.iter().map(|&i| s[i]).collect(),
        kept: y.clone(),
        y,
        converged,
    })
}

/// Computes the `k` algebraically smallest or largest eigenpairs of a Hermitian operator.
///
/// The returned values are ordered from the most extreme inwards (ascending for
/// [`Which::Smallest`], descending for [`Which::Largest`]).
///
/// # Arguments
/// * `operator`: A Hermitian linear operator.
/// * `k`: Number of eigenpairs, at most the operator dimension.
/// * `which`: The end of the spectrum to target.
/// * `want_vectors`: Whether to assemble Ritz vectors.
/// * `params`: Tolerance and operator application budget.
///
/// # Returns
/// The converged [`RitzPairs`], or [`crate::error::OperatorErrorKind::NoConvergence`]
/// when the budget runs out first.
pub fn lanczos_extreme(
    operator: &dyn LinearOperator,
    k: usize,
    which: Which,
    want_vectors: bool,
    params: &KrylovParams,
) -> Result<RitzPairs<f64>, OperatorError> {
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
