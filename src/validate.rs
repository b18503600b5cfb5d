use faer::{complex_native::c64, MatRef};

use crate::linalg::{conj, norm, trace, Eigh};
use crate::{Error, Result};

/// Validate that a matrix is a valid density operator (Hermitian, PSD, trace 1).
///
/// None of the distance functions call this; it is the caller's step.
///
/// # Arguments
/// * `rho`: The matrix to check.
/// * `tol`: Tolerance for numerical checks.
pub fn validate_density_matrix(rho: MatRef<c64>, tol: f64) -> Result<()> {
    let n = rho.nrows();
    if rho.ncols() != n {
        return Err(Error::NotSquare(n, rho.ncols()));
    }

    let tr = trace(rho);
    if (tr.re - 1.0).abs() > tol || tr.im.abs() > tol {
        return Err(Error::InvalidTrace(tr.re));
    }

    for i in 0..n {
        for j in i..n {
            let diff = rho[(i, j)] - conj(rho[(j, i)]);
            if diff.re.abs() > tol || diff.im.abs() > tol {
                return Err(Error::NotHermitian(norm(diff)));
            }
        }
    }

    // Hermitian by now, so the spectrum is real.
    let min_ev = Eigh::new(rho).min();
    if min_ev < -tol {
        return Err(Error::NotPSD(min_ev));
    }

    Ok(())
}
