//! Eigenvalue and eigenvector extraction with a unified dense/sparse interface.
//!
//! [`eigensolve`] validates the request, splits it into "small" and "large" halves of
//! the spectrum, hands each half to one of four [`EigenStrategy`] variants, and
//! merges the results into a globally ordered [`Spectrum`]:
//!
//! | algorithm | Hermitian                          | general                          |
//! |-----------|------------------------------------|----------------------------------|
//! | sparse    | Lanczos, algebraically extreme     | Arnoldi, extreme real part       |
//! | dense     | self-adjoint EVD, index range kept | full general EVD                 |
//!
//! Iterative solvers cannot return "all" eigenvalues directly, so a full-spectrum
//! request is decomposed into a large/small pair of roughly equal size. They also
//! cannot stably return "all but one", so a sparse request for `N - 1` pairs computes
//! all `N` and drops one afterwards ([`drop_trailing_pair`]).

use crate::{
    algorithms::{
        KrylovParams, Which, arnoldi::arnoldi_extreme, arnoldi::cmp_real_then_imag,
        lanczos::lanczos_extreme,
    },
    error::{OperatorError, OperatorErrorKind},
    matrix::ensure_square,
    operator::Operator,
};
use faer::{Mat, MatRef, Side, c64};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default operator application budget of the sparse iterative solvers.
pub const DEFAULT_MAX_ITER: usize = 100_000;

/// Which end of the spectrum comes first in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending; a partial request returns the smallest eigenvalues.
    #[default]
    Low,
    /// Descending; a partial request returns the largest eigenvalues.
    High,
}

impl FromStr for SortOrder {
    type Err = OperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            other => Err(OperatorErrorKind::InvalidSortOrder(other.to_string()).into()),
        }
    }
}

/// Parameters of an eigensolve request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EigenOptions {
    /// Also compute eigenvectors.
    pub vectors: bool,
    /// Use the sparse iterative algorithms instead of dense decompositions.
    pub sparse: bool,
    pub sort: SortOrder,
    /// Number of eigenpairs; `0` requests all of them.
    pub count: usize,
    /// Sparse solver tolerance; `0` selects machine precision.
    pub tol: f64,
    /// Sparse solver budget of operator applications.
    pub max_iter: usize,
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self {
            vectors: true,
            sparse: false,
            sort: SortOrder::Low,
            count: 0,
            tol: 0.0,
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

/// Eigenvalues of an operator: real for Hermitian input, complex otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Eigenvalues {
    Real(Vec<f64>),
    Complex(Vec<c64>),
}

impl Eigenvalues {
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The values as a real slice, if they are real.
    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            Self::Real(v) => Some(v),
            Self::Complex(_) => None,
        }
    }

    /// The values promoted to complex numbers.
    pub fn to_complex(&self) -> Vec<c64> {
        match self {
            Self::Real(v) => v.iter().map(|&x| c64::new(x, 0.0)).collect(),
            Self::Complex(v) => v.clone(),
        }
    }

    fn truncate(&mut self, len: usize) {
        match self {
            Self::Real(v) => v.truncate(len),
            Self::Complex(v) => v.truncate(len),
        }
    }
}

/// Ordered eigenvalues and, optionally, the matching eigenvectors.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub eigenvalues: Eigenvalues,
    /// Eigenvectors as the columns of an `N x k` matrix; column `j` belongs to value `j`.
    pub eigenvectors: Option<Mat<c64>>,
}

/// How a request is split between the two ends of the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SplitPlan {
    num_small: usize,
    num_large: usize,
    /// All pairs were requested in place of `N - 1`; one must be dropped.
    remove_one: bool,
    /// Dense partial requests are truncated to this many pairs after ordering.
    truncate: Option<usize>,
}

impl SplitPlan {
    fn new(n: usize, count: usize, sparse: bool, sort: SortOrder) -> Result<Self, OperatorError> {
        if count > n {
            return Err(OperatorErrorKind::TooManyEigenpairs {
                requested: count,
                dim: n,
            }
            .into());
        }
        let mut count = if count == n { 0 } else { count };

        let remove_one = sparse && count > 0 && count == n - 1;
        if remove_one {
            count = 0;
        }

        let (num_small, num_large) = if count == 0 {
            let d = n.div_ceil(2);
            let m = if n % 2 == 0 { d } else { d - 1 };
            (n - m, n - d)
        } else {
            match sort {
                SortOrder::Low => (count, 0),
                SortOrder::High => (0, count),
            }
        };

        Ok(Self {
            num_small,
            num_large,
            remove_one,
            truncate: (!sparse && count > 0).then_some(count),
        })
    }
}

/// The closed set of eigensolver algorithms, selected once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenStrategy {
    DenseHermitian,
    DenseGeneral,
    SparseHermitian,
    SparseGeneral,
}

impl EigenStrategy {
    pub fn select(sparse: bool, hermitian: bool) -> Self {
        match (sparse, hermitian) {
            (false, true) => Self::DenseHermitian,
            (false, false) => Self::DenseGeneral,
            (true, true) => Self::SparseHermitian,
            (true, false) => Self::SparseGeneral,
        }
    }

    fn is_hermitian(self) -> bool {
        matches!(self, Self::DenseHermitian | Self::SparseHermitian)
    }

    /// Computes the small subset followed by the large subset, unordered.
    fn compute(
        self,
        op: &Operator,
        plan: &SplitPlan,
        opts: &EigenOptions,
    ) -> Result<RawPairs, OperatorError> {
        let params = KrylovParams {
            tol: opts.tol,
            max_iter: opts.max_iter,
        };
        let vectors = opts.vectors;
        match self {
            Self::SparseHermitian => {
                let linop = op.as_linear_operator();
                let small =
                    lanczos_extreme(linop, plan.num_small, Which::Smallest, vectors, &params)?;
                let large =
                    lanczos_extreme(linop, plan.num_large, Which::Largest, vectors, &params)?;
                let promote = |v: Vec<f64>| -> Vec<c64> {
                    v.into_iter().map(|x| c64::new(x, 0.0)).collect()
                };
                Ok(RawPairs::concat(
                    RawPairs {
                        values: promote(small.values),
                        vectors: small.vectors,
                    },
                    RawPairs {
                        values: promote(large.values),
                        vectors: large.vectors,
                    },
                ))
            }
            Self::SparseGeneral => {
                let linop = op.as_linear_operator();
                let small =
                    arnoldi_extreme(linop, plan.num_small, Which::Smallest, vectors, &params)?;
                let large =
                    arnoldi_extreme(linop, plan.num_large, Which::Largest, vectors, &params)?;
                Ok(RawPairs::concat(
                    RawPairs {
                        values: small.values,
                        vectors: small.vectors,
                    },
                    RawPairs {
                        values: large.values,
                        vectors: large.vectors,
                    },
                ))
            }
            Self::DenseHermitian => dense_hermitian(op.full().as_ref(), plan, vectors),
            Self::DenseGeneral => dense_general(op.full().as_ref(), vectors),
        }
    }
}

/// Eigenpairs before global ordering, always carried as complex values.
struct RawPairs {
    values: Vec<c64>,
    vectors: Option<Mat<c64>>,
}

impl RawPairs {
    fn concat(small: RawPairs, large: RawPairs) -> RawPairs {
        let mut values = small.values;
        values.extend(large.values);
        let vectors = match (small.vectors, large.vectors) {
            (Some(a), Some(b)) => Some(hstack(a.as_ref(), b.as_ref())),
            _ => None,
        };
        RawPairs { values, vectors }
    }
}

fn hstack(a: MatRef<'_, c64>, b: MatRef<'_, c64>) -> Mat<c64> {
    let k = a.ncols();
    let mut out = Mat::<c64>::zeros(a.nrows(), k + b.ncols());
    out.as_mut().get_mut(.., 0..k).copy_from(a);
    out.as_mut().get_mut(.., k..).copy_from(b);
    out
}

fn select_columns(m: MatRef<'_, c64>, columns: &[usize]) -> Mat<c64> {
    Mat::from_fn(m.nrows(), columns.len(), |i, j| m[(i, columns[j])])
}

/// Indices kept by a dense Hermitian request, given ascending eigenvalue order.
fn index_range(n: usize, plan: &SplitPlan) -> std::ops::Range<usize> {
    match plan.truncate {
        None => 0..n,
        Some(_) if plan.num_small > 0 => 0..plan.num_small,
        Some(_) => n - plan.num_large..n,
    }
}

fn dense_hermitian(
    a: MatRef<'_, c64>,
    plan: &SplitPlan,
    vectors: bool,
) -> Result<RawPairs, OperatorError> {
    let n = a.nrows();
    if vectors {
        let evd = a.self_adjoint_eigen(Side::Lower)?;
        let s = evd.S();
        let mut ascending: Vec<usize> = (0..n).collect();
        ascending.sort_by(|&i, &j| s[i].re.total_cmp(&s[j].re));
        let kept = &ascending[index_range(n, plan)];
        Ok(RawPairs {
            values: kept.iter().map(|&i| c64::new(s[i].re, 0.0)).collect(),
            vectors: Some(select_columns(evd.U(), kept)),
        })
    } else {
        let mut values = a.self_adjoint_eigenvalues(Side::Lower)?;
        values.sort_by(f64::total_cmp);
        Ok(RawPairs {
            values: values[index_range(n, plan)]
                .iter()
                .map(|&x| c64::new(x, 0.0))
                .collect(),
            vectors: None,
        })
    }
}

/// Partial requests are not supported for general dense operators; the full
/// decomposition is computed and truncated later.
fn dense_general(a: MatRef<'_, c64>, vectors: bool) -> Result<RawPairs, OperatorError> {
    if vectors {
        let evd = a.eigen()?;
        let s = evd.S();
        let n = a.nrows();
        Ok(RawPairs {
            values: (0..n).map(|i| s[i]).collect(),
            vectors: Some(evd.U().to_owned()),
        })
    } else {
        Ok(RawPairs {
            values: a.eigenvalues()?,
            vectors: None,
        })
    }
}

/// Sorts ascending (stable), permutes vectors alike, discards imaginary parts of
/// Hermitian values, and reverses everything for [`SortOrder::High`].
fn order(raw: RawPairs, hermitian: bool, sort: SortOrder) -> Spectrum {
    let mut perm: Vec<usize> = (0..raw.values.len()).collect();
    if hermitian {
        perm.sort_by(|&i, &j| raw.values[i].re.total_cmp(&raw.values[j].re));
    } else {
        perm.sort_by(|&i, &j| cmp_real_then_imag(&raw.values[i], &raw.values[j]));
    }
    if sort == SortOrder::High {
        perm.reverse();
    }

    let eigenvalues = if hermitian {
        Eigenvalues::Real(perm.iter().map(|&i| raw.values[i].re).collect())
    } else {
        Eigenvalues::Complex(perm.iter().map(|&i| raw.values[i]).collect())
    };
    let eigenvectors = raw.vectors.map(|v| select_columns(v.as_ref(), &perm));
    Spectrum {
        eigenvalues,
        eigenvectors,
    }
}

/// Keeps the first `len` pairs.
fn truncate(spectrum: &mut Spectrum, len: usize) {
    spectrum.eigenvalues.truncate(len);
    if let Some(v) = spectrum.eigenvectors.take() {
        let keep = len.min(v.ncols());
        spectrum.eigenvectors = Some(v.as_ref().get(.., 0..keep).to_owned());
    }
}

/// Drops the last pair of an ordered spectrum.
///
/// Applied when `N - 1` pairs were requested from the sparse algorithm: after
/// ordering, the last pair is the one outside the requested extreme (the largest
/// for [`SortOrder::Low`], the smallest for [`SortOrder::High`]).
pub fn drop_trailing_pair(spectrum: &mut Spectrum) {
    let len = spectrum.eigenvalues.len();
    truncate(spectrum, len.saturating_sub(1));
}

/// Computes eigenvalues and, if requested, eigenvectors of a matrix-like operator.
///
/// # Errors
/// * [`OperatorErrorKind::InvalidOperatorType`] for kets and bras.
/// * [`OperatorErrorKind::NonSquare`] for rectangular operators.
/// * [`OperatorErrorKind::TooManyEigenpairs`] when `count > N`.
/// * [`OperatorErrorKind::NoConvergence`] when a sparse solve exhausts `max_iter`.
/// * [`OperatorErrorKind::EvdError`] when a dense decomposition fails.
pub fn eigensolve(op: &Operator, opts: &EigenOptions) -> Result<Spectrum, OperatorError> {
    if op.kind().is_vector_like() {
        return Err(OperatorErrorKind::InvalidOperatorType {
            operation: "diagonalization",
            kind: op.kind(),
        }
        .into());
    }
    ensure_square(op.nrows(), op.ncols())?;
    if !opts.tol.is_finite() {
        return Err(OperatorErrorKind::InputError(format!(
            "sparse solver tolerance must be finite, got {}",
            opts.tol
        ))
        .into());
    }

    let n = op.nrows();
    let plan = SplitPlan::new(n, opts.count, opts.sparse, opts.sort)?;
    let strategy = EigenStrategy::select(opts.sparse, op.isherm());
    log::debug!(
        "Eigensolve n = {n}: {strategy:?}, {} small + {} large, remove_one = {}, truncate = {:?}.",
        plan.num_small,
        plan.num_large,
        plan.remove_one,
        plan.truncate
    );

    let raw = strategy.compute(op, &plan, opts)?;
    let mut spectrum = order(raw, strategy.is_hermitian(), opts.sort);
    if plan.remove_one {
        drop_trailing_pair(&mut spectrum);
    }
    if let Some(count) = plan.truncate {
        truncate(&mut spectrum, count);
    }
    Ok(spectrum)
}

/// Eigenvalues only; `opts.vectors` is ignored.
pub fn eigenvalues(op: &Operator, opts: &EigenOptions) -> Result<Eigenvalues, OperatorError> {
    let opts = EigenOptions {
        vectors: false,
        ..*opts
    };
    Ok(eigensolve(op, &opts)?.eigenvalues)
}

impl Operator {
    /// Eigenvalues and eigenvectors of this operator; see [`eigensolve`].
    pub fn eigenstates(&self, opts: &EigenOptions) -> Result<Spectrum, OperatorError> {
        eigensolve(
            self,
            &EigenOptions {
                vectors: true,
                ..*opts
            },
        )
    }

    /// Eigenvalues of this operator; see [`eigenvalues`].
    pub fn eigenenergies(&self, opts: &EigenOptions) -> Result<Eigenvalues, OperatorError> {
        eigenvalues(self, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn real(values: &Eigenvalues) -> Vec<f64> {
        values.as_real().expect("Hermitian input yields real values").to_vec()
    }

    fn hermitian_sample(n: usize) -> Operator {
        // Tridiagonal with complex couplings; eigenvalues 2 - 2cos(k pi / (n + 1)).
        Operator::dense(Mat::from_fn(n, n, |i, j| {
            if i == j {
                c64::new(2.0, 0.0)
            } else if j == i + 1 {
                c64::new(0.0, -1.0)
            } else if i == j + 1 {
                c64::new(0.0, 1.0)
            } else {
                c64::new(0.0, 0.0)
            }
        }))
    }

    fn exact_sample_spectrum(n: usize) -> Vec<f64> {
        (1..=n)
            .map(|k| 2.0 - 2.0 * (k as f64 * std::f64::consts::PI / (n as f64 + 1.0)).cos())
            .collect()
    }

    #[test]
    fn test_split_plan_full_spectrum() {
        let even = SplitPlan::new(6, 0, true, SortOrder::Low).unwrap();
        assert_eq!((even.num_small, even.num_large), (3, 3));
        let odd = SplitPlan::new(7, 0, true, SortOrder::Low).unwrap();
        assert_eq!((odd.num_small, odd.num_large), (4, 3));
        let one = SplitPlan::new(1, 0, true, SortOrder::Low).unwrap();
        assert_eq!((one.num_small, one.num_large), (1, 0));
        assert!(!one.remove_one);
    }

    #[test]
    fn test_split_plan_partial_and_special_cases() {
        let low = SplitPlan::new(10, 3, false, SortOrder::Low).unwrap();
        assert_eq!((low.num_small, low.num_large, low.truncate), (3, 0, Some(3)));
        let high = SplitPlan::new(10, 3, true, SortOrder::High).unwrap();
        assert_eq!((high.num_small, high.num_large, high.truncate), (0, 3, None));

        let all_but_one = SplitPlan::new(10, 9, true, SortOrder::Low).unwrap();
        assert!(all_but_one.remove_one);
        assert_eq!((all_but_one.num_small, all_but_one.num_large), (5, 5));

        // Only the sparse path uses the special case.
        let dense = SplitPlan::new(10, 9, false, SortOrder::Low).unwrap();
        assert!(!dense.remove_one);
        assert_eq!(dense.truncate, Some(9));

        let full = SplitPlan::new(10, 10, false, SortOrder::High).unwrap();
        assert_eq!((full.num_small, full.num_large, full.truncate), (5, 5, None));
    }

    #[test]
    fn test_too_many_eigenpairs() {
        let err = SplitPlan::new(4, 5, false, SortOrder::Low).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidRequest);
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("low".parse::<SortOrder>().unwrap(), SortOrder::Low);
        assert_eq!("high".parse::<SortOrder>().unwrap(), SortOrder::High);
        let err = "middle".parse::<SortOrder>().unwrap_err();
        assert_eq!(
            *err.kind(),
            OperatorErrorKind::InvalidSortOrder("middle".to_string())
        );
    }

    #[test]
    fn test_strategy_table() {
        assert_eq!(EigenStrategy::select(true, true), EigenStrategy::SparseHermitian);
        assert_eq!(EigenStrategy::select(true, false), EigenStrategy::SparseGeneral);
        assert_eq!(EigenStrategy::select(false, true), EigenStrategy::DenseHermitian);
        assert_eq!(EigenStrategy::select(false, false), EigenStrategy::DenseGeneral);
    }

    #[test]
    fn test_drop_trailing_pair_removes_last_column() {
        let mut spectrum = Spectrum {
            eigenvalues: Eigenvalues::Real(vec![1.0, 2.0, 3.0]),
            eigenvectors: Some(Mat::from_fn(3, 3, |i, j| c64::new((i * 3 + j) as f64, 0.0))),
        };
        drop_trailing_pair(&mut spectrum);
        assert_eq!(spectrum.eigenvalues, Eigenvalues::Real(vec![1.0, 2.0]));
        let v = spectrum.eigenvectors.unwrap();
        assert_eq!(v.ncols(), 2);
        assert_eq!(v[(2, 1)], c64::new(7.0, 0.0));
    }

    #[test]
    fn test_order_permutes_vectors_with_values() {
        let raw = RawPairs {
            values: vec![c64::new(3.0, 0.0), c64::new(-1.0, 0.0), c64::new(2.0, 0.0)],
            vectors: Some(Mat::from_fn(1, 3, |_, j| c64::new(j as f64, 0.0))),
        };
        let spectrum = order(raw, true, SortOrder::High);
        assert_eq!(spectrum.eigenvalues, Eigenvalues::Real(vec![3.0, 2.0, -1.0]));
        let v = spectrum.eigenvectors.unwrap();
        assert_eq!(v[(0, 0)], c64::new(0.0, 0.0));
        assert_eq!(v[(0, 1)], c64::new(2.0, 0.0));
        assert_eq!(v[(0, 2)], c64::new(1.0, 0.0));
    }

    #[test]
    fn test_dense_hermitian_partial_requests() {
        let op = hermitian_sample(8);
        let exact = exact_sample_spectrum(8);

        let low = eigensolve(&op, &EigenOptions { count: 3, ..Default::default() }).unwrap();
        let values = real(&low.eigenvalues);
        assert_eq!(values.len(), 3);
        for (got, want) in values.iter().zip(&exact[..3]) {
            assert!((got - want).abs() < 1e-10);
        }
        assert_eq!(low.eigenvectors.unwrap().ncols(), 3);

        let high = eigenvalues(
            &op,
            &EigenOptions { count: 2, sort: SortOrder::High, ..Default::default() },
        )
        .unwrap();
        let values = real(&high);
        assert!((values[0] - exact[7]).abs() < 1e-10);
        assert!((values[1] - exact[6]).abs() < 1e-10);
    }

    #[test]
    fn test_sparse_hermitian_matches_dense() {
        let op = hermitian_sample(30);
        let sparse_op = Operator::sparse(op.data().unwrap());
        let opts = EigenOptions { sparse: true, vectors: false, ..Default::default() };
        let sparse = real(&eigenvalues(&sparse_op, &opts).unwrap());
        let dense = real(&eigenvalues(&op, &EigenOptions::default()).unwrap());
        assert_eq!(sparse.len(), 30);
        for (s, d) in sparse.iter().zip(&dense) {
            assert!((s - d).abs() < 1e-8, "sparse {s} vs dense {d}");
        }
    }

    #[test]
    fn test_vector_like_operands_are_rejected() {
        let ket = Operator::dense(Mat::from_fn(3, 1, |_, _| c64::new(1.0, 0.0)));
        let err = eigensolve(&ket, &EigenOptions::default()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidOperatorType);
    }
}
