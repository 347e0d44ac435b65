//! Krylov subspace eigensolvers used by the sparse branch of the eigensolver dispatcher.
//!
//! ** NOTE: We recommend using the high-level method [`crate::eigen::eigensolve`] instead.
//! This module is intended for use cases where direct control over the Krylov
//! projection is required.
//!
//! Both solvers share the [`KrylovBasis`] process defined here: an orthonormal basis
//! `V_m` of the Krylov subspace is grown one operator application at a time with full
//! (twice-repeated block Gram-Schmidt) reorthogonalization, while the projection
//! `H_m = V_m^H A V_m` is recorded column by column. The Hermitian solver
//! ([`lanczos`]) reads the real symmetric part of `H_m`, the general solver
//! ([`arnoldi`]) uses the full matrix. The small projected eigenproblems are handed
//! to faer's dense eigendecompositions.
//!
//! The basis never holds more than `ncv = max(2k + 1, 20)` vectors. When a cycle fills
//! it without converging, the solve is thick-restarted: the wanted Ritz vectors are
//! kept as the start of the next cycle, together with their coupling to the residual
//! direction, so that `A V_p = V_p S + v_{p+1} b^H` holds exactly as before the
//! restart. Memory therefore scales as O(n * ncv), independently of the number of
//! restarts.
//!
//! A Ritz pair `(theta, y)` is converged once `|b_m^H y| <= tol * max(|theta|, eps^(2/3))`,
//! where `b_m^H` is the last row of the `(m + 1) x m` projection.

pub mod arnoldi;
pub mod lanczos;

use crate::{
    error::{OperatorError, OperatorErrorKind},
    matrix::LinearOperator,
};
use faer::{Accum, Mat, MatRef, Par, Scale, c64, linalg::matmul::matmul};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Fixed seed for starting vectors and restart directions, so solves are reproducible.
const KRYLOV_SEED: u64 = 42;

/// Smallest subspace dimension used by a restarted solve.
pub(crate) const MIN_SUBSPACE: usize = 20;

/// Which end of the spectrum a Krylov solve targets.
///
/// For Hermitian operators this is the algebraic order of the (real) eigenvalues,
/// for general operators the order of their real parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    Smallest,
    Largest,
}

/// Convergence controls for the Krylov solvers.
#[derive(Debug, Clone, Copy)]
pub struct KrylovParams {
    /// Relative residual tolerance; values `<= 0` select machine precision.
    pub tol: f64,
    /// Maximum number of operator applications.
    pub max_iter: usize,
}

impl KrylovParams {
    pub(crate) fn effective_tol(&self) -> f64 {
        if self.tol > 0.0 { self.tol } else { f64::EPSILON }
    }
}

/// Converged Ritz pairs returned by the Krylov solvers, in the order the target end
/// of the spectrum was ranked (most extreme first).
#[derive(Debug, Clone)]
pub struct RitzPairs<V> {
    pub values: Vec<V>,
    /// Ritz vectors as the columns of an `n x k` matrix, when requested.
    pub vectors: Option<Mat<c64>>,
}

/// Number of basis vectors a solve for `k` pairs of an `n x n` operator may hold.
pub fn subspace_dimension(k: usize, n: usize) -> usize {
    (2 * k + 1).max(MIN_SUBSPACE).min(n)
}

/// Number of Ritz vectors carried over by a thick restart.
fn restart_size(k: usize, ncv: usize) -> usize {
    (k + (ncv - k) / 2).min(ncv - 1)
}

/// Residual threshold below which a Ritz pair counts as converged.
pub(crate) fn convergence_threshold(tol: f64, theta_abs: f64) -> f64 {
    let eps23 = f64::EPSILON.powf(2.0 / 3.0);
    tol * theta_abs.max(eps23)
}

/// Relative size below which a new basis direction is treated as lost to cancellation.
fn breakdown_tolerance(n: usize) -> f64 {
    10.0 * n as f64 * f64::EPSILON
}

fn one() -> c64 {
    c64::new(1.0, 0.0)
}

/// Ritz data for the wanted end of the spectrum after one Krylov cycle.
pub(crate) struct Cycle<V> {
    /// Wanted Ritz values, most extreme first. The first `k` are the requested ones,
    /// the rest are kept to accelerate the next cycle.
    pub(crate) values: Vec<V>,
    /// Unit coefficient vectors of the Ritz vectors in the current basis, as columns.
    pub(crate) y: Mat<c64>,
    /// Orthonormal basis of `span(y)`, the subspace kept by a restart.
    pub(crate) kept: Mat<c64>,
    /// Number of converged pairs among the first `k`.
    pub(crate) converged: usize,
}

/// An orthonormal Krylov basis together with the projected matrix `H`.
///
/// With `m` vectors in use, columns `0..m` of `V` span the subspace and column `m`
/// holds the next direction (absent when the basis already spans the space). `H` is
/// `(m + 1) x m`: upper Hessenberg for a plain Arnoldi process, with a leading dense
/// block after a restart.
pub(crate) struct KrylovBasis<'a> {
    operator: &'a dyn LinearOperator,
    v: Mat<c64>,
    h: Mat<c64>,
    len: usize,
    /// Number of Ritz vectors carried over by the last restart.
    locked: usize,
    applications: usize,
    rng: StdRng,
    /// Largest `||A v_j||` seen so far, the scale for breakdown detection.
    scale: f64,
}

impl<'a> KrylovBasis<'a> {
    /// Allocates a basis of at most `capacity` vectors with a seeded random start.
    pub(crate) fn new(operator: &'a dyn LinearOperator, capacity: usize) -> Self {
        let n = operator.nrows();
        let capacity = capacity.min(n);
        let mut rng = StdRng::seed_from_u64(KRYLOV_SEED);
        let start = random_vector(&mut rng, n);
        let start = &start * Scale(c64::new(1.0 / start.norm_l2(), 0.0));

        let mut v = Mat::<c64>::zeros(n, capacity + 1);
        v.col_mut(0).copy_from(start.col(0));
        Self {
            operator,
            v,
            h: Mat::zeros(capacity + 1, capacity),
            len: 0,
            locked: 0,
            applications: 0,
            rng,
            scale: 0.0,
        }
    }

    /// Dimension of the projected matrix.
    pub(crate) fn steps(&self) -> usize {
        self.len
    }

    pub(crate) fn locked(&self) -> usize {
        self.locked
    }

    /// Operator applications spent so far, across restarts.
    pub(crate) fn applications(&self) -> usize {
        self.applications
    }

    pub(crate) fn capacity(&self) -> usize {
        self.h.ncols()
    }

    pub(crate) fn dim(&self) -> usize {
        self.operator.nrows()
    }

    /// Takes steps until the projection has dimension `target` or `budget` operator
    /// applications have been spent in total. Returns the number of steps taken.
    pub(crate) fn extend_to(&mut self, target: usize, budget: usize) -> usize {
        let target = target.min(self.capacity());
        let mut taken = 0;
        while self.len < target && self.applications < budget {
            self.step();
            taken += 1;
        }
        log::trace!(
            "Krylov basis extended by {taken} steps to dimension {} (n = {}).",
            self.len,
            self.dim()
        );
        taken
    }

    fn step(&mut self) {
        let n = self.dim();
        let j = self.len;
        let mut w = self.operator.apply(self.v.as_ref().get(.., j..j + 1));
        self.applications += 1;
        self.scale = self.scale.max(w.norm_l2());

        // Classical block Gram-Schmidt, repeated once to restore orthogonality.
        let mut h = Mat::<c64>::zeros(j + 1, 1);
        {
            let basis = self.v.as_ref().get(.., 0..j + 1);
            for _ in 0..2 {
                let coeffs = basis.adjoint() * &w;
                w = &w - basis * &coeffs;
                h = &h + &coeffs;
            }
        }
        self.h.as_mut().get_mut(0..j + 1, j..j + 1).copy_from(&h);

        let beta = w.norm_l2();
        if j + 1 < n {
            if beta > breakdown_tolerance(n) * self.scale {
                self.h[(j + 1, j)] = c64::new(beta, 0.0);
                let next = &w * Scale(c64::new(1.0 / beta, 0.0));
                self.v.col_mut(j + 1).copy_from(next.col(0));
            } else {
                // Invariant subspace found: continue in a fresh direction, decoupled in H.
                log::trace!("Krylov breakdown at step {j}: beta = {beta:e}, restarting direction.");
                self.h[(j + 1, j)] = c64::new(0.0, 0.0);
                let fresh = self.fresh_direction(j + 1);
                self.v.col_mut(j + 1).copy_from(fresh.col(0));
            }
        } else {
            self.h[(j + 1, j)] = c64::new(beta, 0.0);
        }
        self.len += 1;
    }

    /// A random unit vector orthogonal to the first `cols` basis vectors.
    fn fresh_direction(&mut self, cols: usize) -> Mat<c64> {
        let n = self.dim();
        let basis = self.v.as_ref().get(.., 0..cols);
        loop {
            let mut w = random_vector(&mut self.rng, n);
            for _ in 0..2 {
                let coeffs = basis.adjoint() * &w;
                w = &w - basis * &coeffs;
            }
            let norm = w.norm_l2();
            // The basis has fewer than n vectors, so a random draw keeps a component.
            if norm > f64::EPSILON.sqrt() {
                return &w * Scale(c64::new(1.0 / norm, 0.0));
            }
        }
    }

    /// The square `m x m` projected matrix `H_m`.
    pub(crate) fn projected(&self) -> MatRef<'_, c64> {
        self.h.as_ref().get(0..self.len, 0..self.len)
    }

    /// `|b_m^H y_j|` for each column `y_j`: the residual norm `||A V_m y_j - theta_j V_m y_j||`.
    pub(crate) fn residuals(&self, y: MatRef<'_, c64>) -> Vec<f64> {
        let m = self.len;
        if m >= self.dim() {
            return vec![0.0; y.ncols()];
        }
        let r = self.h.as_ref().get(m..m + 1, 0..m) * y;
        (0..y.ncols()).map(|j| r[(0, j)].norm()).collect()
    }

    /// Assembles the Ritz vectors `V_m Y`.
    pub(crate) fn ritz_vectors(&self, y: MatRef<'_, c64>) -> Mat<c64> {
        let mut x = Mat::<c64>::zeros(self.dim(), y.ncols());
        matmul(
            x.as_mut(),
            Accum::Replace,
            self.v.as_ref().get(.., 0..self.len),
            y,
            one(),
            Par::Seq,
        );
        x
    }

    /// Thick restart onto the subspace spanned by the orthonormal columns of `q`.
    ///
    /// With `V_new = V_m Q`, `S = Q^H H_m Q` and `b^H = b_m^H Q`, the relation
    /// `A V_new = V_new S + v_{m+1} b^H` carries over from the current cycle, and
    /// `v_{m+1}` becomes the next direction.
    pub(crate) fn restart(&mut self, q: MatRef<'_, c64>) {
        let m = self.len;
        let p = q.ncols();
        debug_assert!(p < m && m < self.dim());

        let s = q.adjoint() * self.projected() * q;
        let b = self.h.as_ref().get(m..m + 1, 0..m) * q;
        let kept = self.ritz_vectors(q);
        let next = self.v.as_ref().get(.., m..m + 1).to_owned();

        self.v.as_mut().get_mut(.., 0..p).copy_from(&kept);
        self.v.as_mut().get_mut(.., p..p + 1).copy_from(&next);
        self.h = Mat::zeros(self.h.nrows(), self.h.ncols());
        self.h.as_mut().get_mut(0..p, 0..p).copy_from(&s);
        self.h.as_mut().get_mut(p..p + 1, 0..p).copy_from(&b);
        self.len = p;
        self.locked = p;
        log::trace!("Krylov restart keeping {p} of {m} Ritz vectors.");
    }
}

/// Runs restarted Krylov cycles until `select` reports `k` converged pairs.
///
/// `select(basis, keep)` ranks the Ritz pairs of the current projection and returns
/// the `keep` most wanted ones. A solve that exhausts `params.max_iter` operator
/// applications first is reported as [`OperatorErrorKind::NoConvergence`].
pub(crate) fn solve_restarted<V, F>(
    basis: &mut KrylovBasis<'_>,
    k: usize,
    params: &KrylovParams,
    mut select: F,
) -> Result<Cycle<V>, OperatorError>
where
    F: FnMut(&KrylovBasis<'_>, usize) -> Result<Cycle<V>, OperatorError>,
{
    let n = basis.dim();
    let ncv = basis.capacity();
    let keep = if ncv < n { restart_size(k, ncv) } else { k };
    loop {
        basis.extend_to(ncv, params.max_iter);
        let cycle = select(basis, keep.min(basis.steps()))?;
        log::trace!(
            "Krylov cycle at dimension {} ({} applications): {} of {k} Ritz pairs converged.",
            basis.steps(),
            basis.applications(),
            cycle.converged
        );
        if cycle.converged >= k {
            return Ok(cycle);
        }
        if basis.applications() >= params.max_iter || basis.steps() >= n {
            log::warn!(
                "Krylov solver stopped after {} applications with {} of {k} pairs converged.",
                basis.applications(),
                cycle.converged
            );
            return Err(OperatorErrorKind::NoConvergence {
                converged: cycle.converged,
                requested: k,
                iterations: basis.applications(),
            }
            .into());
        }
        basis.restart(cycle.kept.as_ref());
    }
}

fn random_vector(rng: &mut StdRng, n: usize) -> Mat<c64> {
    Mat::from_fn(n, 1, |_, _| {
        c64::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5)
    })
}
