//! Bounded scalar minimization.
//!
//! Brent's method restricted to an interval: golden-section steps, accelerated by parabolic
//! interpolation when the last few points allow it. No derivatives are needed, and the
//! endpoints themselves are never evaluated.

use tracing::debug;

use crate::{Error, Result};

/// Result of a bounded minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    /// Abscissa of the best point found.
    pub x: f64,
    /// Objective value at `x`.
    pub value: f64,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// False if the evaluation budget ran out before `xatol` was reached.
    pub converged: bool,
}

/// Derivative-free minimizer of a scalar function over a closed interval.
#[derive(Debug, Clone, Copy)]
pub struct BoundedMinimizer {
    /// Absolute tolerance on the abscissa.
    pub xatol: f64,
    /// Evaluation budget.
    pub max_evals: usize,
}

impl Default for BoundedMinimizer {
    fn default() -> Self {
        Self {
            xatol: 1e-5,
            max_evals: 500,
        }
    }
}

const GOLDEN_MEAN: f64 = 0.381_966_011_250_105_1; // (3 - sqrt 5) / 2

impl BoundedMinimizer {
    pub fn new(xatol: f64, max_evals: usize) -> Self {
        Self { xatol, max_evals }
    }

    /// Minimize `f` over `[lower, upper]`.
    ///
    /// Failed or non-finite evaluations count as `+inf`, which steers the search away from the
    /// offending region instead of aborting it. Trial points are clamped into the interval.
    pub fn minimize<F>(&self, mut f: F, lower: f64, upper: f64) -> Result<Minimum>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        if !(lower.is_finite() && upper.is_finite()) || lower > upper {
            return Err(Error::InvalidBounds(lower, upper));
        }

        let mut eval = |x: f64| -> f64 {
            match f(x.clamp(lower, upper)) {
                Ok(v) if v.is_finite() => v,
                Ok(v) => {
                    debug!(x, value = v, "non-finite objective value");
                    f64::INFINITY
                }
                Err(err) => {
                    debug!(x, %err, "objective evaluation failed");
                    f64::INFINITY
                }
            }
        };

        let sqrt_eps = f64::EPSILON.sqrt();
        let (mut a, mut b) = (lower, upper);

        // xf: best point so far, nfc: second best, fulc: previous value of nfc
        let mut xf = a + GOLDEN_MEAN * (b - a);
        let mut fx = eval(xf);
        let (mut nfc, mut fnfc) = (xf, fx);
        let (mut fulc, mut ffulc) = (xf, fx);
        let mut evaluations = 1;
        let mut converged = true;

        let mut rat: f64 = 0.0;
        let mut e: f64 = 0.0;
        let mut xm = 0.5 * (a + b);
        let mut tol1 = sqrt_eps * xf.abs() + self.xatol / 3.0;
        let mut tol2 = 2.0 * tol1;

        while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
            let mut golden = true;

            if e.abs() > tol1 && fx.is_finite() && fnfc.is_finite() && ffulc.is_finite() {
                let r = (xf - nfc) * (fx - ffulc);
                let q = (xf - fulc) * (fx - fnfc);
                let mut p = (xf - fulc) * q - (xf - nfc) * r;
                let mut q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();
                let r = e;
                e = rat;

                if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                    rat = p / q;
                    let x = xf + rat;
                    if (x - a) < tol2 || (b - x) < tol2 {
                        rat = tol1 * sign_or_one(xm - xf);
                    }
                    golden = false;
                }
            }

            if golden {
                e = if xf >= xm { a - xf } else { b - xf };
                rat = GOLDEN_MEAN * e;
            }

            let x = xf + sign_or_one(rat) * rat.abs().max(tol1);
            let fu = eval(x);
            evaluations += 1;

            if fu <= fx {
                if x >= xf {
                    a = xf;
                } else {
                    b = xf;
                }
                (fulc, ffulc) = (nfc, fnfc);
                (nfc, fnfc) = (xf, fx);
                (xf, fx) = (x, fu);
            } else {
                if x < xf {
                    a = x;
                } else {
                    b = x;
                }
                if fu <= fnfc || nfc == xf {
                    (fulc, ffulc) = (nfc, fnfc);
                    (nfc, fnfc) = (x, fu);
                } else if fu <= ffulc || fulc == xf || fulc == nfc {
                    (fulc, ffulc) = (x, fu);
                }
            }

            xm = 0.5 * (a + b);
            tol1 = sqrt_eps * xf.abs() + self.xatol / 3.0;
            tol2 = 2.0 * tol1;

            if evaluations >= self.max_evals {
                converged = false;
                break;
            }
        }

        if !fx.is_finite() {
            return Err(Error::NoFiniteValue);
        }

        Ok(Minimum {
            x: xf,
            value: fx,
            evaluations,
            converged,
        })
    }
}

/// `signum` that maps zero to +1.
fn sign_or_one(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parabola_interior_minimum() {
        let m = BoundedMinimizer::default()
            .minimize(|x| Ok((x - 0.3).powi(2) + 1.0), 0.0, 1.0)
            .unwrap();
        assert!(m.converged);
        assert!((m.x - 0.3).abs() < 1e-4, "x={}", m.x);
        assert!((m.value - 1.0).abs() < 1e-8);
    }

    #[test]
    fn monotone_function_approaches_boundary() {
        let m = BoundedMinimizer::default()
            .minimize(|x| Ok(x), 0.0, 1.0)
            .unwrap();
        assert!(m.x < 1e-4, "x={}", m.x);
        assert!(m.x >= 0.0);
    }

    #[test]
    fn tolerates_failures_near_boundary() {
        let m = BoundedMinimizer::default()
            .minimize(
                |x| {
                    if x > 0.95 {
                        Err(Error::ComplexResidue(1.0))
                    } else {
                        Ok((x - 0.9).powi(2))
                    }
                },
                0.0,
                1.0,
            )
            .unwrap();
        assert!((m.x - 0.9).abs() < 1e-4, "x={}", m.x);
    }

    #[test]
    fn constant_function() {
        let m = BoundedMinimizer::default()
            .minimize(|_| Ok(1.0), 0.0, 1.0)
            .unwrap();
        assert!((0.0..=1.0).contains(&m.x));
        assert_eq!(m.value, 1.0);
    }

    #[test]
    fn all_failures_is_an_error() {
        let r = BoundedMinimizer::default().minimize(|_| Ok(f64::NAN), 0.0, 1.0);
        assert!(matches!(r, Err(Error::NoFiniteValue)));
    }

    #[test]
    fn rejects_reversed_bounds() {
        let r = BoundedMinimizer::default().minimize(|x| Ok(x), 1.0, 0.0);
        assert!(matches!(r, Err(Error::InvalidBounds(_, _))));
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let m = BoundedMinimizer::new(1e-12, 3)
            .minimize(|x| Ok((x - 0.3).powi(2)), 0.0, 1.0)
            .unwrap();
        assert!(!m.converged);
        assert_eq!(m.evaluations, 3);
    }
}
