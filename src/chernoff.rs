//! Quantum Chernoff bound.
//!
//! \[
//! \xi_{QCB}(\rho, \sigma) = -\log \min_{0 \le s \le 1} \operatorname{Tr}\rho^s\sigma^{1-s}
//! \]
//!
//! Given `n` copies of either `rho` or `sigma`, the minimum error probability for telling them
//! apart decays as \(e^{-n\xi_{QCB}}\) (Audenaert et al., PRL 98, 160501, 2007).

use faer::{complex_native::c64, MatRef};
use tracing::warn;

use crate::linalg::{fractional_power, real_if_close, trace};
use crate::optimize::BoundedMinimizer;
use crate::{Error, Result};

/// Non-logarithmic quantum Chernoff bound and the exponent achieving it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChernoffBound {
    /// \(Q_{QCB} = \min_s \operatorname{Tr}\rho^s\sigma^{1-s}\).
    pub qcb: f64,
    /// The minimizing `s`.
    pub s_opt: f64,
}

impl ChernoffBound {
    /// Logarithmic form \(\xi_{QCB} = -\ln Q_{QCB}\).
    pub fn xi(&self) -> f64 {
        -self.qcb.ln()
    }
}

/// \(\operatorname{Tr}\rho^s\sigma^{1-s}\), snapped to the real axis.
fn chernoff_objective(rho: MatRef<c64>, sigma: MatRef<c64>, s: f64) -> Result<f64> {
    let rho_s = fractional_power(rho, s);
    let sigma_1ms = fractional_power(sigma, 1.0 - s);
    real_if_close(trace((rho_s.as_ref() * sigma_1ms.as_ref()).as_ref()))
}

/// Quantum Chernoff bound between `rho` and `sigma` using the default [`BoundedMinimizer`].
///
/// Returns the non-logarithmic bound; use [`ChernoffBound::xi`] for \(\xi_{QCB}\). When
/// `rho == sigma` the objective is constant (equal to 1), so `s_opt` is arbitrary in `[0, 1]`.
pub fn quantum_chernoff_bound(rho: MatRef<c64>, sigma: MatRef<c64>) -> Result<ChernoffBound> {
    quantum_chernoff_bound_with(rho, sigma, &BoundedMinimizer::default())
}

/// Quantum Chernoff bound with a caller-configured minimizer.
pub fn quantum_chernoff_bound_with(
    rho: MatRef<c64>,
    sigma: MatRef<c64>,
    minimizer: &BoundedMinimizer,
) -> Result<ChernoffBound> {
    let n = rho.nrows();
    if rho.ncols() != n {
        return Err(Error::NotSquare(n, rho.ncols()));
    }
    if sigma.nrows() != n || sigma.ncols() != n {
        return Err(Error::DimensionMismatch(n, n, sigma.nrows(), sigma.ncols()));
    }

    let min = minimizer.minimize(|s| chernoff_objective(rho, sigma, s), 0.0, 1.0)?;
    if !min.converged {
        warn!(
            evaluations = min.evaluations,
            s = min.x,
            "Chernoff bound minimization hit its evaluation budget"
        );
    }

    Ok(ChernoffBound {
        qcb: min.value,
        s_opt: min.x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::tests::{basis_state, maximally_mixed, random_density};
    use crate::states::{fidelity, trace_distance};

    #[test]
    fn self_bound_is_one() {
        let rho = random_density(3, 3, 5);
        let qcb = quantum_chernoff_bound(rho.as_ref(), rho.as_ref()).unwrap();
        assert!((qcb.qcb - 1.0).abs() < 1e-8, "qcb={}", qcb.qcb);
        assert!((0.0..=1.0).contains(&qcb.s_opt));
        assert!(qcb.xi().abs() < 1e-8);
    }

    #[test]
    fn pure_state_self_bound() {
        let rho = basis_state(2, 1);
        let qcb = quantum_chernoff_bound(rho.as_ref(), rho.as_ref()).unwrap();
        assert!((qcb.qcb - 1.0).abs() < 1e-8);
    }

    #[test]
    fn commuting_states_match_classical_chernoff() {
        // diag(p) vs diag(q): min_s sum p^s q^(1-s)
        let mut rho = maximally_mixed(2);
        rho[(0, 0)] = c64::new(0.9, 0.0);
        rho[(1, 1)] = c64::new(0.1, 0.0);
        let sigma = maximally_mixed(2);

        let qcb = quantum_chernoff_bound(rho.as_ref(), sigma.as_ref()).unwrap();

        let classical = |s: f64| 0.9f64.powf(s) * 0.5f64.powf(1.0 - s) + 0.1f64.powf(s) * 0.5f64.powf(1.0 - s);
        let grid_min = (0..=10_000)
            .map(|k| classical(k as f64 / 10_000.0))
            .fold(f64::INFINITY, f64::min);
        assert!((qcb.qcb - grid_min).abs() < 1e-7, "qcb={} grid={}", qcb.qcb, grid_min);
        assert!(qcb.s_opt > 0.0 && qcb.s_opt < 1.0);
    }

    #[test]
    fn sandwiched_by_fidelity_and_trace_distance() {
        // 1 - T <= Q <= sqrt(F) for the non-logarithmic bound
        let rho = random_density(2, 2, 61);
        let sigma = random_density(2, 2, 62);
        let q = quantum_chernoff_bound(rho.as_ref(), sigma.as_ref())
            .unwrap()
            .qcb;
        let t = trace_distance(rho.as_ref(), sigma.as_ref()).unwrap();
        let f = fidelity(rho.as_ref(), sigma.as_ref()).unwrap();
        assert!(q >= 1.0 - t - 1e-7, "q={q} t={t}");
        assert!(q <= f.sqrt() + 1e-7, "q={q} f={f}");
    }

    #[test]
    fn dimension_mismatch() {
        let rho = maximally_mixed(2);
        let sigma = maximally_mixed(4);
        assert!(matches!(
            quantum_chernoff_bound(rho.as_ref(), sigma.as_ref()),
            Err(Error::DimensionMismatch(..))
        ));
    }
}
