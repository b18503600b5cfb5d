//! Distances between quantum states.
//!
//! All functions expect density matrices (Hermitian, PSD, trace 1) of equal dimension unless
//! stated otherwise, and do not check the first three properties. See
//! [`crate::validate_density_matrix`].

use faer::{complex_native::c64, Mat, MatRef, Side};

use crate::linalg::{conj, hermitian_part, nuclear_norm, sqrt_psd, trace, ZERO};
use crate::{Error, Result};

fn check_same_shape(a: MatRef<c64>, b: MatRef<c64>) -> Result<()> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(Error::DimensionMismatch(
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols(),
        ));
    }
    Ok(())
}

fn check_states(rho: MatRef<c64>, sigma: MatRef<c64>) -> Result<()> {
    if rho.nrows() != rho.ncols() {
        return Err(Error::NotSquare(rho.nrows(), rho.ncols()));
    }
    check_same_shape(rho, sigma)
}

/// Purity \(P = \operatorname{Tr}\rho^2\).
///
/// The lower end of the range depends on the dimension \(d\): \(1/d \le P \le 1\). With
/// `dim_renorm` the value is rescaled to \(\frac{d}{d-1}(P - 1/d)\), which lies in \([0, 1]\)
/// for every \(d > 1\). A 1-dimensional state has no range to rescale, so `dim_renorm` is
/// ignored there and the plain purity is returned.
pub fn purity(rho: MatRef<c64>, dim_renorm: bool) -> f64 {
    let p = trace((rho * rho).as_ref()).re;
    if dim_renorm && rho.nrows() > 1 {
        let dim = rho.nrows() as f64;
        (dim / (dim - 1.0)) * (p - 1.0 / dim)
    } else {
        p
    }
}

/// Fidelity \(F(\rho, \sigma) = (\operatorname{Tr}\sqrt{\sqrt{\rho}\sigma\sqrt{\rho}})^2\).
///
/// Returns a value in [0, 1], equal to 1 iff \(\rho = \sigma\). For pure states this is
/// \(|\langle\psi|\phi\rangle|^2\). This is the squared (Nielsen & Chuang "root-free")
/// convention.
pub fn fidelity(rho: MatRef<c64>, sigma: MatRef<c64>) -> Result<f64> {
    check_states(rho, sigma)?;

    let sqrt_rho = sqrt_psd(rho);
    let temp = sqrt_rho.as_ref() * sigma;
    let prod = temp.as_ref() * sqrt_rho.as_ref();

    // Tr sqrt(A) = sum of sqrt(eigenvalues(A)) for Hermitian PSD A. The product is Hermitian
    // only up to rounding, so symmetrize before reading the lower triangle.
    let evals = hermitian_part(prod.as_ref()).selfadjoint_eigenvalues(Side::Lower);
    let root_trace: f64 = evals
        .iter()
        .filter(|&&val| val > 0.0)
        .map(|val| val.sqrt())
        .sum();

    Ok(root_trace * root_trace)
}

/// Trace distance \(T(\rho, \sigma) = \frac{1}{2}\|\rho - \sigma\|_1\), with the trace norm
/// taken as the sum of singular values of the difference.
pub fn trace_distance(rho: MatRef<c64>, sigma: MatRef<c64>) -> Result<f64> {
    check_states(rho, sigma)?;
    let n = rho.nrows();
    let diff = Mat::from_fn(n, n, |i, j| rho[(i, j)] - sigma[(i, j)]);
    Ok(0.5 * nuclear_norm(diff.as_ref()))
}

/// Bures distance \(D_B(\rho, \sigma) = \sqrt{2(1 - \sqrt{F(\rho, \sigma)})}\).
pub fn bures_distance(rho: MatRef<c64>, sigma: MatRef<c64>) -> Result<f64> {
    let root_f = fidelity(rho, sigma)?.sqrt();
    // F can overshoot 1 by rounding
    Ok((2.0 * (1.0 - root_f)).max(0.0).sqrt())
}

/// Bures angle \(D_A(\rho, \sigma) = \arccos\sqrt{F(\rho, \sigma)}\), also called Bures arc or
/// Bures length.
pub fn bures_angle(rho: MatRef<c64>, sigma: MatRef<c64>) -> Result<f64> {
    let root_f = fidelity(rho, sigma)?.sqrt();
    Ok(root_f.clamp(-1.0, 1.0).acos())
}

/// Hilbert-Schmidt inner product \((A|B) = \operatorname{Tr}A^\dagger B\).
///
/// Defined for any two operators of equal shape.
pub fn hilbert_schmidt_ip(a: MatRef<c64>, b: MatRef<c64>) -> Result<c64> {
    check_same_shape(a, b)?;
    let mut ip = ZERO;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            ip = ip + conj(a[(i, j)]) * b[(i, j)];
        }
    }
    Ok(ip)
}

/// Smith fidelity \(F_S(\rho, \sigma) = \sqrt{F(\rho, \sigma)}^{\,p}\) for \(0 \le p < 2\).
///
/// For \(p < 2\) this dominates the standard fidelity. There is no known operational
/// interpretation for arbitrary `power`.
pub fn smith_fidelity(rho: MatRef<c64>, sigma: MatRef<c64>, power: f64) -> Result<f64> {
    if power < 0.0 {
        return Err(Error::NegativePower(power));
    }
    if power >= 2.0 {
        return Err(Error::PowerTooLarge(power));
    }
    Ok(fidelity(rho, sigma)?.sqrt().powf(power))
}

/// Total variation distance \(\frac{1}{2}\sum_x |P(x) - Q(x)|\) between two probability
/// vectors over the same finite alphabet.
///
/// Normalization of `p` and `q` is the caller's responsibility.
pub fn total_variation_distance(p: &[f64], q: &[f64]) -> Result<f64> {
    if p.len() != q.len() {
        return Err(Error::LengthMismatch(p.len(), q.len()));
    }
    Ok(p.iter().zip(q).map(|(a, b)| (a - b).abs()).sum::<f64>() / 2.0)
}
