//! Semidefinite programs over Hermitian matrix variables.
//!
//! A program is described backend-independently by [`SdpProblem`]: Hermitian positive
//! semi-definite variables, real linear equalities, linear matrix inequalities, and a linear
//! objective to maximize. Any [`SdpSolver`] can then solve it; [`InteriorPointSolver`] is the
//! built-in backend.
//!
//! ```text
//! maximize    sum_k Re Tr(C_k^† X_k)
//! subject to  sum_k Re Tr(A_k^† X_k) = b            (equalities)
//!             sum_k c_k embed_k(X_k) ⪯ F            (LMIs)
//!             X_k ⪰ 0
//! ```

use faer::{complex_native::c64, solvers::SpSolver, Mat, MatRef, Side};
use tracing::{debug, warn};

use crate::linalg::{conj, hermitian_part, inverse_pd, norm, Eigh, HALF, ZERO};
use crate::{Error, Result};

/// Handle to a matrix variable of an [`SdpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(usize);

/// How a variable enters a linear matrix inequality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embedding {
    /// `X` itself.
    Direct,
    /// \(I_m \otimes X\).
    KronIdentity(usize),
}

impl Embedding {
    fn output_dim(self, dim: usize) -> usize {
        match self {
            Embedding::Direct => dim,
            Embedding::KronIdentity(m) => m * dim,
        }
    }
}

/// One `coeff * embed(var)` summand of a linear matrix inequality.
#[derive(Debug, Clone, Copy)]
pub struct LmiTerm {
    pub var: Var,
    pub coeff: f64,
    pub embedding: Embedding,
}

impl LmiTerm {
    pub fn new(var: Var, coeff: f64, embedding: Embedding) -> Self {
        Self {
            var,
            coeff,
            embedding,
        }
    }
}

#[derive(Debug, Clone)]
struct Equality {
    terms: Vec<(Var, Mat<c64>)>,
    rhs: f64,
}

#[derive(Debug, Clone)]
struct Lmi {
    terms: Vec<LmiTerm>,
    rhs: Mat<c64>,
}

/// A semidefinite program in maximization form.
#[derive(Debug, Clone, Default)]
pub struct SdpProblem {
    dims: Vec<usize>,
    equalities: Vec<Equality>,
    lmis: Vec<Lmi>,
    objective: Vec<(Var, Mat<c64>)>,
}

impl SdpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a `dim x dim` Hermitian positive semi-definite variable.
    pub fn add_psd_variable(&mut self, dim: usize) -> Var {
        self.dims.push(dim);
        Var(self.dims.len() - 1)
    }

    pub fn dim(&self, var: Var) -> usize {
        self.dims[var.0]
    }

    pub fn num_variables(&self) -> usize {
        self.dims.len()
    }

    /// \(\operatorname{Tr} X = \) `value`.
    pub fn add_trace_constraint(&mut self, var: Var, value: f64) {
        let dim = self.dim(var);
        self.add_equality(vec![(var, Mat::identity(dim, dim))], value);
    }

    /// \(\sum_k \operatorname{Re}\operatorname{Tr}(A_k^\dagger X_k) = \) `rhs`.
    ///
    /// # Panics
    /// If a coefficient matrix does not match its variable's dimension.
    pub fn add_equality(&mut self, terms: Vec<(Var, Mat<c64>)>, rhs: f64) {
        for (var, a) in &terms {
            let dim = self.dim(*var);
            assert_eq!((a.nrows(), a.ncols()), (dim, dim));
        }
        self.equalities.push(Equality { terms, rhs });
    }

    /// \(\sum_k c_k\,\mathrm{embed}_k(X_k) \preceq F\).
    ///
    /// # Panics
    /// If the embedded terms and `rhs` do not all have the same size.
    pub fn add_lmi(&mut self, terms: Vec<LmiTerm>, rhs: Mat<c64>) {
        let size = rhs.nrows();
        assert_eq!(rhs.ncols(), size);
        for term in &terms {
            assert_eq!(term.embedding.output_dim(self.dim(term.var)), size);
        }
        self.lmis.push(Lmi { terms, rhs });
    }

    /// Set the objective \(\sum_k \operatorname{Re}\operatorname{Tr}(C_k^\dagger X_k)\) to be
    /// maximized, replacing any previous one.
    ///
    /// # Panics
    /// If a coefficient matrix does not match its variable's dimension.
    pub fn maximize(&mut self, terms: Vec<(Var, Mat<c64>)>) {
        for (var, c) in &terms {
            let dim = self.dim(*var);
            assert_eq!((c.nrows(), c.ncols()), (dim, dim));
        }
        self.objective = terms;
    }
}

/// Optimal point of an [`SdpProblem`].
#[derive(Debug, Clone)]
pub struct SdpSolution {
    /// Optimal objective value.
    pub value: f64,
    /// One matrix per declared variable, in declaration order.
    pub variables: Vec<Mat<c64>>,
    pub iterations: usize,
}

impl SdpSolution {
    pub fn variable(&self, var: Var) -> MatRef<'_, c64> {
        self.variables[var.0].as_ref()
    }
}

/// Why a solve failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Iteration limit reached before the tolerances were met.
    MaxIterations,
    /// A linear solve or step computation broke down.
    NumericalError,
}

/// A semidefinite programming backend.
pub trait SdpSolver {
    fn solve(&self, problem: &SdpProblem) -> Result<SdpSolution>;
}

/// Infeasible primal-dual path-following interior point method (HKM search direction).
///
/// Works on the block-diagonal standard form
/// `min <C, X>  s.t.  <A_i, X> = b_i,  X ⪰ 0` with \(\langle A, X \rangle =
/// \operatorname{Re}\operatorname{Tr}(AX)\), where every LMI gets a slack block.
#[derive(Debug, Clone, Copy)]
pub struct InteriorPointSolver {
    pub max_iters: usize,
    /// Bound on relative duality gap and relative primal/dual infeasibility.
    pub tolerance: f64,
    /// Fraction of the distance to the cone boundary taken per step.
    pub step_fraction: f64,
}

impl Default for InteriorPointSolver {
    fn default() -> Self {
        Self {
            max_iters: 100,
            tolerance: 1e-8,
            step_fraction: 0.95,
        }
    }
}

/// Sparse Hermitian constraint matrix; both triangles are stored.
type SparseHermitian = Vec<(usize, usize, c64)>;

/// Block-diagonal standard form in minimization convention.
struct StandardForm {
    n: usize,
    /// Offset of each block in the big matrix; user variables first, then LMI slacks.
    offsets: Vec<usize>,
    dims: Vec<usize>,
    c: Mat<c64>,
    a: Vec<SparseHermitian>,
    b: Vec<f64>,
}

/// Entries of the functional `w * Re X[p, q]`.
fn re_entries(row: &mut SparseHermitian, p: usize, q: usize, w: f64) {
    if p == q {
        row.push((p, p, c64::new(w, 0.0)));
    } else {
        row.push((p, q, c64::new(0.5 * w, 0.0)));
        row.push((q, p, c64::new(0.5 * w, 0.0)));
    }
}

/// Entries of the functional `w * Im X[p, q]`, `p != q`.
fn im_entries(row: &mut SparseHermitian, p: usize, q: usize, w: f64) {
    row.push((p, q, c64::new(0.0, 0.5 * w)));
    row.push((q, p, c64::new(0.0, -0.5 * w)));
}

/// Dense Hermitian `A` (Hermitian part of a general coefficient) scattered at `offset`.
fn dense_entries(row: &mut SparseHermitian, a: MatRef<c64>, offset: usize) {
    let h = hermitian_part(a);
    for j in 0..h.ncols() {
        for i in 0..h.nrows() {
            let v = h[(i, j)];
            if v.re != 0.0 || v.im != 0.0 {
                row.push((offset + i, offset + j, v));
            }
        }
    }
}

impl StandardForm {
    fn build(problem: &SdpProblem) -> Self {
        let mut dims = problem.dims.clone();
        dims.extend(problem.lmis.iter().map(|lmi| lmi.rhs.nrows()));
        let mut offsets = Vec::with_capacity(dims.len());
        let mut n = 0;
        for &d in &dims {
            offsets.push(n);
            n += d;
        }

        let mut c = Mat::<c64>::zeros(n, n);
        for (var, coeff) in &problem.objective {
            let off = offsets[var.0];
            let h = hermitian_part(coeff.as_ref());
            for j in 0..h.ncols() {
                for i in 0..h.nrows() {
                    c[(off + i, off + j)] = c[(off + i, off + j)] - h[(i, j)];
                }
            }
        }

        let mut a = Vec::new();
        let mut b = Vec::new();

        for eq in &problem.equalities {
            let mut row = SparseHermitian::new();
            for (var, coeff) in &eq.terms {
                dense_entries(&mut row, coeff.as_ref(), offsets[var.0]);
            }
            a.push(row);
            b.push(eq.rhs);
        }

        // slack + sum_k c_k embed_k(X_k) = F, entry by entry on the upper triangle
        for (l, lmi) in problem.lmis.iter().enumerate() {
            let slack = offsets[problem.dims.len() + l];
            let size = lmi.rhs.nrows();
            for q in 0..size {
                for p in 0..=q {
                    let mut re_row = SparseHermitian::new();
                    let mut im_row = SparseHermitian::new();
                    re_entries(&mut re_row, slack + p, slack + q, 1.0);
                    if p != q {
                        im_entries(&mut im_row, slack + p, slack + q, 1.0);
                    }
                    for term in &lmi.terms {
                        let off = offsets[term.var.0];
                        let dim = problem.dims[term.var.0];
                        let (i, j) = match term.embedding {
                            Embedding::Direct => (p, q),
                            Embedding::KronIdentity(_) => {
                                if p / dim != q / dim {
                                    continue;
                                }
                                (p % dim, q % dim)
                            }
                        };
                        re_entries(&mut re_row, off + i, off + j, term.coeff);
                        if p != q {
                            im_entries(&mut im_row, off + i, off + j, term.coeff);
                        }
                    }
                    let f = lmi.rhs[(p, q)];
                    a.push(re_row);
                    b.push(f.re);
                    if p != q {
                        a.push(im_row);
                        b.push(f.im);
                    }
                }
            }
        }

        Self {
            n,
            offsets,
            dims,
            c,
            a,
            b,
        }
    }

    /// `<A_i, K>` for every constraint. `K` need not be Hermitian; only its Hermitian part
    /// contributes.
    fn apply(&self, k: MatRef<c64>) -> Vec<f64> {
        self.a
            .iter()
            .map(|row| row.iter().map(|&(p, q, v)| (v * k[(q, p)]).re).sum())
            .collect()
    }

    /// \(\sum_i y_i A_i\).
    fn adjoint(&self, y: &[f64]) -> Mat<c64> {
        let mut out = Mat::<c64>::zeros(self.n, self.n);
        for (row, &yi) in self.a.iter().zip(y) {
            for &(p, q, v) in row {
                out[(p, q)] = out[(p, q)] + v * c64::new(yi, 0.0);
            }
        }
        out
    }

    /// Schur complement \(M_{ij} = \operatorname{Re}\operatorname{Tr}(A_i X A_j Z^{-1})\).
    fn schur(&self, x: MatRef<c64>, zinv: MatRef<c64>) -> Mat<f64> {
        let m = self.a.len();
        let mut out = Mat::<f64>::zeros(m, m);
        for i in 0..m {
            for j in i..m {
                let mut acc = ZERO;
                for &(p, q, v) in &self.a[i] {
                    for &(r, s, w) in &self.a[j] {
                        acc = acc + v * x[(q, r)] * w * zinv[(s, p)];
                    }
                }
                out[(i, j)] = acc.re;
                out[(j, i)] = acc.re;
            }
        }
        out
    }

    fn initial_scale(&self) -> (f64, f64) {
        let n = self.n as f64;
        let c_norm = frobenius(self.c.as_ref());
        let mut xi = 10.0f64.max(n.sqrt());
        let mut eta = xi.max(c_norm);
        for (row, &bi) in self.a.iter().zip(&self.b) {
            let a_norm = row.iter().map(|&(_, _, v)| norm(v).powi(2)).sum::<f64>().sqrt();
            xi = xi.max(n * (1.0 + bi.abs()) / (1.0 + a_norm));
            eta = eta.max(a_norm);
        }
        (xi, eta)
    }

    fn extract(&self, x: MatRef<c64>, count: usize) -> Vec<Mat<c64>> {
        (0..count)
            .map(|k| {
                let (off, d) = (self.offsets[k], self.dims[k]);
                Mat::from_fn(d, d, |i, j| x[(off + i, off + j)])
            })
            .collect()
    }
}

/// \(\operatorname{Re}\operatorname{Tr}(AB)\).
fn inner(a: MatRef<c64>, b: MatRef<c64>) -> f64 {
    let mut acc = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            acc += (a[(i, j)] * b[(j, i)]).re;
        }
    }
    acc
}

fn frobenius(a: MatRef<c64>) -> f64 {
    let mut acc = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            acc += norm(a[(i, j)]).powi(2);
        }
    }
    acc.sqrt()
}

fn scaled_identity(n: usize, s: f64) -> Mat<c64> {
    Mat::from_fn(n, n, |i, j| if i == j { c64::new(s, 0.0) } else { ZERO })
}

/// `x + alpha * d`, re-symmetrized.
fn step(x: MatRef<c64>, alpha: f64, d: MatRef<c64>) -> Mat<c64> {
    let n = x.nrows();
    let alpha = c64::new(alpha, 0.0);
    Mat::from_fn(n, n, |i, j| {
        let a = x[(i, j)] + d[(i, j)] * alpha;
        let b = x[(j, i)] + d[(j, i)] * alpha;
        (a + conj(b)) * HALF
    })
}

/// Largest `alpha` with `x + alpha * d ⪰ 0`, for `x ≻ 0`.
fn max_step(x: MatRef<c64>, d: MatRef<c64>) -> f64 {
    let x_inv_sqrt = Eigh::new(x).map(|val| c64::new(1.0 / val.sqrt(), 0.0));
    let t = (x_inv_sqrt.as_ref() * d).as_ref() * x_inv_sqrt.as_ref();
    let lambda_min = Eigh::new(hermitian_part(t.as_ref()).as_ref()).min();
    if lambda_min >= 0.0 {
        f64::INFINITY
    } else {
        -1.0 / lambda_min
    }
}

fn solve_schur(m: &Mat<f64>, rhs: &Mat<f64>) -> Option<Mat<f64>> {
    let dy = match m.cholesky(Side::Lower) {
        Ok(llt) => llt.solve(rhs),
        // Loses definiteness to rounding close to the optimum.
        Err(_) => m.partial_piv_lu().solve(rhs),
    };
    (0..dy.nrows())
        .all(|i| dy[(i, 0)].is_finite())
        .then_some(dy)
}

impl SdpSolver for InteriorPointSolver {
    fn solve(&self, problem: &SdpProblem) -> Result<SdpSolution> {
        let sf = StandardForm::build(problem);
        let (n, m) = (sf.n, sf.a.len());

        let (xi, eta) = sf.initial_scale();
        let mut x = scaled_identity(n, xi);
        let mut z = scaled_identity(n, eta);
        let mut y = vec![0.0; m];

        let b_norm = sf.b.iter().map(|v| v * v).sum::<f64>().sqrt();
        let c_norm = frobenius(sf.c.as_ref());
        let mut sigma = 0.3;

        for iter in 0..self.max_iters {
            let ax = sf.apply(x.as_ref());
            let rp: Vec<f64> = sf.b.iter().zip(&ax).map(|(b, a)| b - a).collect();
            let aty = sf.adjoint(&y);
            let rd = Mat::from_fn(n, n, |i, j| sf.c[(i, j)] - z[(i, j)] - aty[(i, j)]);

            let pobj = inner(sf.c.as_ref(), x.as_ref());
            let dobj: f64 = sf.b.iter().zip(&y).map(|(b, y)| b * y).sum();
            let gap = (pobj - dobj).abs() / (1.0 + pobj.abs() + dobj.abs());
            let pinf = rp.iter().map(|v| v * v).sum::<f64>().sqrt() / (1.0 + b_norm);
            let dinf = frobenius(rd.as_ref()) / (1.0 + c_norm);

            debug!(iter, pobj, dobj, gap, pinf, dinf, "interior point iteration");

            if gap < self.tolerance && pinf < self.tolerance && dinf < self.tolerance {
                return Ok(SdpSolution {
                    value: -pobj,
                    variables: sf.extract(x.as_ref(), problem.num_variables()),
                    iterations: iter,
                });
            }

            let mu = inner(x.as_ref(), z.as_ref()) / n as f64;
            let zinv = inverse_pd(z.as_ref());
            let centering = c64::new(sigma * mu, 0.0);
            let target = Mat::from_fn(n, n, |i, j| zinv[(i, j)] * centering - x[(i, j)]);

            // M dy = rp - A(sigma mu Z^-1 - X - X Rd Z^-1)
            let x_rd_zinv = (x.as_ref() * rd.as_ref()).as_ref() * zinv.as_ref();
            let k = Mat::from_fn(n, n, |i, j| target[(i, j)] - x_rd_zinv[(i, j)]);
            let ak = sf.apply(k.as_ref());
            let rhs = Mat::from_fn(m, 1, |i, _| rp[i] - ak[i]);

            let schur = sf.schur(x.as_ref(), zinv.as_ref());
            let Some(dy) = solve_schur(&schur, &rhs) else {
                warn!(iter, "Schur complement solve failed");
                return Err(Error::Unsolved {
                    status: SolveStatus::NumericalError,
                    iterations: iter,
                });
            };
            let dy: Vec<f64> = (0..m).map(|i| dy[(i, 0)]).collect();

            let at_dy = sf.adjoint(&dy);
            let dz = Mat::from_fn(n, n, |i, j| rd[(i, j)] - at_dy[(i, j)]);
            let x_dz_zinv = (x.as_ref() * dz.as_ref()).as_ref() * zinv.as_ref();
            let dx_raw = Mat::from_fn(n, n, |i, j| target[(i, j)] - x_dz_zinv[(i, j)]);
            let dx = hermitian_part(dx_raw.as_ref());

            let alpha_p = (self.step_fraction * max_step(x.as_ref(), dx.as_ref())).min(1.0);
            let alpha_d = (self.step_fraction * max_step(z.as_ref(), dz.as_ref())).min(1.0);
            if !(alpha_p.is_finite() && alpha_d.is_finite()) || alpha_p <= 0.0 || alpha_d <= 0.0
            {
                warn!(iter, alpha_p, alpha_d, "interior point step collapsed");
                return Err(Error::Unsolved {
                    status: SolveStatus::NumericalError,
                    iterations: iter,
                });
            }

            x = step(x.as_ref(), alpha_p, dx.as_ref());
            z = step(z.as_ref(), alpha_d, dz.as_ref());
            for (yi, di) in y.iter_mut().zip(&dy) {
                *yi += alpha_d * di;
            }

            // Recenter after short steps, push toward the optimum after long ones.
            sigma = if alpha_p.min(alpha_d) > 0.5 { 0.1 } else { 0.5 };
        }

        warn!(iterations = self.max_iters, "interior point method did not converge");
        Err(Error::Unsolved {
            status: SolveStatus::MaxIterations,
            iterations: self.max_iters,
        })
    }
}
