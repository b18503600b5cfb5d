//! Hermitian matrix functions and small dense helpers.
//!
//! Everything is built on the self-adjoint eigendecomposition \(A = U \Lambda U^\dagger\):
//! a matrix function is \(f(A) = U f(\Lambda) U^\dagger\).

use faer::{complex_native::c64, Mat, MatRef, Side};

use crate::{Error, Result};

/// Relative size (against the spectral radius) below which a negative eigenvalue is treated as
/// floating-point noise and set to zero.
pub const EIGEN_CLAMP_TOL: f64 = 1e-12;

/// Largest imaginary part, relative to `max(1, |re|)`, that is snapped away when a
/// mathematically real trace comes back complex.
pub const REAL_IF_CLOSE_TOL: f64 = 1e-10;

#[inline]
pub(crate) fn conj(z: c64) -> c64 {
    c64::new(z.re, -z.im)
}

#[inline]
pub(crate) fn norm(z: c64) -> f64 {
    z.re.hypot(z.im)
}

pub(crate) const ZERO: c64 = c64 { re: 0.0, im: 0.0 };
pub(crate) const HALF: c64 = c64 { re: 0.5, im: 0.0 };

/// Trace of a square matrix.
pub fn trace(a: MatRef<c64>) -> c64 {
    (0..a.nrows().min(a.ncols())).fold(ZERO, |acc, i| acc + a[(i, i)])
}

/// \((A + A^\dagger) / 2\).
pub fn hermitian_part(a: MatRef<c64>) -> Mat<c64> {
    let n = a.nrows();
    Mat::from_fn(n, n, |i, j| (a[(i, j)] + conj(a[(j, i)])) * HALF)
}

/// Kronecker product \(A \otimes B\).
pub fn kron(a: MatRef<c64>, b: MatRef<c64>) -> Mat<c64> {
    let (br, bc) = (b.nrows(), b.ncols());
    Mat::from_fn(a.nrows() * br, a.ncols() * bc, |i, j| {
        a[(i / br, j / bc)] * b[(i % br, j % bc)]
    })
}

/// Sum of singular values (trace norm).
pub fn nuclear_norm(a: MatRef<c64>) -> f64 {
    a.singular_values().iter().sum()
}

/// Integer square root of `n` if `n` is a perfect square.
pub fn perfect_sqrt(n: usize) -> Option<usize> {
    let r = (n as f64).sqrt().round() as usize;
    // f64 rounding can be off by one for very large n
    [r.saturating_sub(1), r, r + 1]
        .into_iter()
        .find(|&c| c.checked_mul(c) == Some(n))
}

/// Snap a complex scalar that should be real onto the real axis.
pub fn real_if_close(z: c64) -> Result<f64> {
    if z.im.abs() <= REAL_IF_CLOSE_TOL * z.re.abs().max(1.0) {
        Ok(z.re)
    } else {
        Err(Error::ComplexResidue(z.im))
    }
}

/// Build a dense matrix from a row-major buffer with an explicit shape.
///
/// This is the entry point for data that arrives as an n-dimensional array: anything that is
/// not 2-D is rejected with [`Error::NotAMatrix`].
pub fn matrix_from_shape(shape: &[usize], data: &[c64]) -> Result<Mat<c64>> {
    if shape.len() != 2 {
        return Err(Error::NotAMatrix(shape.len()));
    }
    let (rows, cols) = (shape[0], shape[1]);
    if rows.checked_mul(cols) != Some(data.len()) {
        return Err(Error::ShapeMismatch {
            shape: shape.to_vec(),
            len: data.len(),
        });
    }
    Ok(Mat::from_fn(rows, cols, |i, j| data[i * cols + j]))
}

/// Eigendecomposition of a Hermitian matrix. Only the lower triangle is read.
pub(crate) struct Eigh {
    pub values: Vec<f64>,
    vectors: Mat<c64>,
}

impl Eigh {
    pub fn new(a: MatRef<c64>) -> Self {
        let evd = a.selfadjoint_eigendecomposition(Side::Lower);
        let s = evd.s().column_vector();
        let values = (0..a.nrows()).map(|j| s.read(j).re).collect();
        Self {
            values,
            vectors: evd.u().to_owned(),
        }
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Threshold under which negative eigenvalues count as zero.
    fn clamp_cutoff(&self) -> f64 {
        let radius = self.values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        EIGEN_CLAMP_TOL * radius
    }

    /// \(U f(\Lambda) U^\dagger\).
    pub fn map(&self, f: impl Fn(f64) -> c64) -> Mat<c64> {
        let u = self.vectors.as_ref();
        let n = u.nrows();
        let mut u_f = Mat::<c64>::zeros(n, n);
        for (j, &val) in self.values.iter().enumerate() {
            let fv = f(val);
            for i in 0..n {
                u_f[(i, j)] = u[(i, j)] * fv;
            }
        }
        u_f.as_ref() * u.adjoint()
    }
}

/// Principal square root of a Hermitian PSD matrix. Negative eigenvalues are set to zero.
pub fn sqrt_psd(a: MatRef<c64>) -> Mat<c64> {
    Eigh::new(a).map(|val| {
        let root = if val < 0.0 { 0.0 } else { val.sqrt() };
        c64::new(root, 0.0)
    })
}

/// Principal fractional power \(A^p\) of a Hermitian matrix, `p >= 0`.
///
/// `p = 0` gives the identity (including on the kernel), matching \(0^0 = 1\). A negative
/// eigenvalue that survives clamping is raised on the principal branch,
/// \(|\lambda|^p e^{i\pi p}\), so the result may be complex.
pub fn fractional_power(a: MatRef<c64>, p: f64) -> Mat<c64> {
    let eig = Eigh::new(a);
    let cutoff = eig.clamp_cutoff();
    eig.map(|val| {
        if val >= 0.0 || -val <= cutoff {
            c64::new(val.max(0.0).powf(p), 0.0)
        } else {
            let modulus = (-val).powf(p);
            let arg = std::f64::consts::PI * p;
            c64::new(modulus * arg.cos(), modulus * arg.sin())
        }
    })
}

/// Inverse of a Hermitian positive-definite matrix.
pub(crate) fn inverse_pd(a: MatRef<c64>) -> Mat<c64> {
    Eigh::new(a).map(|val| c64::new(1.0 / val, 0.0))
}
