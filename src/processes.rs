//! Distances between quantum processes.
//!
//! Pauli-Liouville and Choi matrices of a channel on a `d`-dimensional system are
//! `d^2 x d^2`. Choi matrices are un-normalized (trace `d` for trace-preserving maps).

use faer::{complex_native::c64, Mat, MatRef};

use crate::linalg::{conj, hermitian_part, matrix_from_shape, nuclear_norm, perfect_sqrt, ZERO};
use crate::sdp::{Embedding, InteriorPointSolver, LmiTerm, SdpProblem, SdpSolver};
use crate::{Error, Result};

/// # Panics
/// If the shapes differ or the matrices are not square.
fn assert_same_square_shape(a: MatRef<c64>, b: MatRef<c64>) {
    assert_eq!(
        (a.nrows(), a.ncols()),
        (b.nrows(), b.ncols()),
        "superoperators must have the same shape"
    );
    assert_eq!(a.nrows(), a.ncols(), "superoperators must be square");
}

/// Hilbert-space dimension `d` of a pair of `d^2 x d^2` superoperators.
///
/// # Panics
/// If the shapes differ or the matrices are not square.
fn superoperator_dim(a: MatRef<c64>, b: MatRef<c64>) -> usize {
    assert_same_square_shape(a, b);
    // floor of the square root when the side is not a perfect square
    (a.nrows() as f64).sqrt() as usize
}

/// Entanglement fidelity \(F_e(E, F) = \operatorname{Tr}[E^\dagger F] / d^2\) between two
/// channels given as Pauli-Liouville matrices.
///
/// See Horodecki et al., PRA 60, 1888 (1999), and Nielsen, Phys. Lett. A 303, 249 (2002).
/// Returns the real part; for Hermiticity-preserving channels the Pauli-Liouville matrices are
/// real and the trace is exactly real.
///
/// # Panics
/// If the shapes differ or the matrices are not square.
pub fn entanglement_fidelity(pauli_lio0: MatRef<c64>, pauli_lio1: MatRef<c64>) -> f64 {
    let dim = superoperator_dim(pauli_lio0, pauli_lio1);
    let mut tr = ZERO;
    for j in 0..pauli_lio0.ncols() {
        for i in 0..pauli_lio0.nrows() {
            tr = tr + conj(pauli_lio0[(i, j)]) * pauli_lio1[(i, j)];
        }
    }
    tr.re / (dim * dim) as f64
}

/// Process fidelity \(F(E, F) = (d F_e + 1) / (d + 1)\), also written
/// \((\operatorname{Tr}[E^\dagger F] + d) / (d^2 + d)\).
///
/// Some texts call this the gate fidelity and call \(F_e\) the process fidelity. When `E` is
/// an ideal gate and `F` an estimate of the implemented process, \(1 - F\) measures gate
/// error, though it is not a metric.
///
/// # Panics
/// If the shapes differ or the matrices are not square.
pub fn process_fidelity(pauli_lio0: MatRef<c64>, pauli_lio1: MatRef<c64>) -> f64 {
    let dim = superoperator_dim(pauli_lio0, pauli_lio1) as f64;
    let fe = entanglement_fidelity(pauli_lio0, pauli_lio1);
    (dim * fe + 1.0) / (dim + 1.0)
}

/// Diamond norm distance between two channels given as Choi matrices, using the built-in
/// [`InteriorPointSolver`].
///
/// Solves the simplified semidefinite program of Watrous (Theory of Computing 5, 217, 2009):
///
/// ```text
/// maximize    Re Tr(Δ^† W)
/// subject to  W ⪯ I_d ⊗ ρ,  W ⪰ 0,  ρ ⪰ 0,  Tr ρ = 1
/// ```
///
/// with `Δ` the Hermitian part of `choi0 - choi1`; the distance is twice the optimum.
///
/// Choi matrices are ordered output ⊗ input, \(J = \sum_{ij} \Phi(|i\rangle\langle j|) \otimes
/// |i\rangle\langle j|\), so the second tensor factor is the one the channel acts on. For a
/// single Kraus operator `K` this is \(|K\rangle\rangle\langle\langle K|\) with `K` stacked
/// row by row. The input-first convention gives wrong results for non-unital channels.
///
/// The program has `O(d^4)` constraints, so the cost grows very quickly with the number of
/// qubits (`d = 2^N`). One and two qubits take milliseconds; three qubits take about a minute
/// in an optimized build and much longer in a debug build. Four or more is impractical.
///
/// # Panics
/// If the shapes differ or the matrices are not square.
pub fn diamond_norm_distance(choi0: MatRef<c64>, choi1: MatRef<c64>) -> Result<f64> {
    diamond_norm_distance_with(choi0, choi1, &InteriorPointSolver::default())
}

/// [`diamond_norm_distance`] with an arbitrary SDP backend.
pub fn diamond_norm_distance_with<S: SdpSolver + ?Sized>(
    choi0: MatRef<c64>,
    choi1: MatRef<c64>,
    solver: &S,
) -> Result<f64> {
    assert_same_square_shape(choi0, choi1);
    let dim_squared = choi0.nrows();
    let dim = perfect_sqrt(dim_squared)
        .ok_or(Error::NotPerfectSquare(dim_squared, choi0.ncols()))?;

    let diff = Mat::from_fn(dim_squared, dim_squared, |i, j| {
        choi0[(i, j)] - choi1[(i, j)]
    });
    let delta = hermitian_part(diff.as_ref());

    let mut prog = SdpProblem::new();
    let rho = prog.add_psd_variable(dim);
    prog.add_trace_constraint(rho, 1.0);
    let w = prog.add_psd_variable(dim_squared);
    prog.add_lmi(
        vec![
            LmiTerm::new(w, 1.0, Embedding::Direct),
            LmiTerm::new(rho, -1.0, Embedding::KronIdentity(dim)),
        ],
        Mat::zeros(dim_squared, dim_squared),
    );
    prog.maximize(vec![(w, delta)]);

    let solution = solver.solve(&prog)?;
    // the norm is non-negative; anything below zero is solver tolerance
    Ok((2.0 * solution.value).max(0.0))
}

/// Watrous bounds on the diamond norm of a superoperator in the Choi representation.
///
/// Returns `(lower, upper) = (ν, n ν)` where `ν` is the nuclear norm (sum of singular values)
/// of `choi` and `n` its row count. Applied to the difference of two Choi matrices this bounds
/// their diamond norm distance without solving a semidefinite program. `ν` is a lower bound
/// only for Choi matrices normalized to unit trace; for the un-normalized convention divide it
/// by `d`. See <https://cstheory.stackexchange.com/a/4920>.
pub fn watrous_bounds(choi: MatRef<c64>) -> Result<(f64, f64)> {
    let (rows, cols) = (choi.nrows(), choi.ncols());
    if perfect_sqrt(rows).is_none() || perfect_sqrt(cols).is_none() {
        return Err(Error::NotPerfectSquare(rows, cols));
    }
    let nuclear = nuclear_norm(choi);
    Ok((nuclear, rows as f64 * nuclear))
}

/// [`watrous_bounds`] for a row-major buffer of arbitrary rank.
///
/// Anything that is not 2-D fails with [`Error::NotAMatrix`] before the perfect-square check.
pub fn watrous_bounds_shaped(shape: &[usize], data: &[c64]) -> Result<(f64, f64)> {
    let choi = matrix_from_shape(shape, data)?;
    watrous_bounds(choi.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::kron;
    use crate::linalg::tests::c;
    use crate::sdp::{SdpSolution, SolveStatus};

    const TOL: f64 = 1e-6;

    /// Pauli-Liouville matrix of a qubit depolarizing channel, diag(1, p, p, p).
    fn depolarizing_plm(p: f64) -> Mat<c64> {
        Mat::from_fn(4, 4, |i, j| match (i, j) {
            (0, 0) => c(1.0, 0.0),
            (i, j) if i == j => c(p, 0.0),
            _ => ZERO,
        })
    }

    /// |K>><<K| for a single Kraus operator, row-stacked so the output factor comes first.
    /// For unitary K this is the un-normalized Choi matrix.
    fn unitary_choi(u: MatRef<c64>) -> Mat<c64> {
        let d = u.nrows();
        let vec_u = Mat::from_fn(d * d, 1, |k, _| u[(k / d, k % d)]);
        vec_u.as_ref() * vec_u.adjoint()
    }

    fn pauli_x() -> Mat<c64> {
        Mat::from_fn(2, 2, |i, j| if i != j { c(1.0, 0.0) } else { ZERO })
    }

    /// Choi matrix of the qubit amplitude damping channel.
    fn amplitude_damping_choi(gamma: f64) -> Mat<c64> {
        let k0 = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => c(1.0, 0.0),
            (1, 1) => c((1.0 - gamma).sqrt(), 0.0),
            _ => ZERO,
        });
        let k1 = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 1) => c(gamma.sqrt(), 0.0),
            _ => ZERO,
        });
        let a = unitary_choi(k0.as_ref());
        let b = unitary_choi(k1.as_ref());
        Mat::from_fn(4, 4, |i, j| a[(i, j)] + b[(i, j)])
    }

    #[test]
    fn unitary_self_fidelities_are_one() {
        let id = Mat::<c64>::identity(4, 4);
        assert!((entanglement_fidelity(id.as_ref(), id.as_ref()) - 1.0).abs() < TOL);
        assert!((process_fidelity(id.as_ref(), id.as_ref()) - 1.0).abs() < TOL);

        // X gate: diag(1, 1, -1, -1) in the Pauli basis
        let x = Mat::from_fn(4, 4, |i, j| match (i, j) {
            (0, 0) | (1, 1) => c(1.0, 0.0),
            (i, j) if i == j => c(-1.0, 0.0),
            _ => ZERO,
        });
        assert!((entanglement_fidelity(x.as_ref(), x.as_ref()) - 1.0).abs() < TOL);
        assert!((process_fidelity(x.as_ref(), x.as_ref()) - 1.0).abs() < TOL);
        assert!(entanglement_fidelity(id.as_ref(), x.as_ref()).abs() < TOL);
    }

    #[test]
    fn depolarizing_self_fidelity_is_its_purity() {
        let e = depolarizing_plm(0.8);
        let fe = entanglement_fidelity(e.as_ref(), e.as_ref());
        assert!((fe - (1.0 + 3.0 * 0.64) / 4.0).abs() < TOL);
    }

    #[test]
    fn fidelity_to_identity_of_depolarizing() {
        // F_e = (1 + 3p) / 4, F = (2 F_e + 1) / 3
        let id = Mat::<c64>::identity(4, 4);
        let e = depolarizing_plm(0.5);
        let fe = entanglement_fidelity(id.as_ref(), e.as_ref());
        assert!((fe - 0.625).abs() < TOL);
        let f = process_fidelity(id.as_ref(), e.as_ref());
        assert!((f - 0.75).abs() < TOL);
    }

    #[test]
    #[should_panic(expected = "same shape")]
    fn entanglement_fidelity_shape_mismatch_panics() {
        let a = Mat::<c64>::identity(4, 4);
        let b = Mat::<c64>::identity(16, 16);
        entanglement_fidelity(a.as_ref(), b.as_ref());
    }

    #[test]
    #[should_panic(expected = "square")]
    fn process_fidelity_non_square_panics() {
        let a = Mat::<c64>::zeros(4, 16);
        process_fidelity(a.as_ref(), a.as_ref());
    }

    #[test]
    #[should_panic(expected = "same shape")]
    fn diamond_shape_mismatch_panics() {
        let a = Mat::<c64>::identity(4, 4);
        let b = Mat::<c64>::identity(9, 9);
        let _ = diamond_norm_distance(a.as_ref(), b.as_ref());
    }

    #[test]
    fn diamond_of_identical_channels_is_zero() {
        let choi = amplitude_damping_choi(0.3);
        let d = diamond_norm_distance(choi.as_ref(), choi.as_ref()).unwrap();
        assert!(d.abs() < TOL, "d={d}");
    }

    #[test]
    fn diamond_identity_vs_bit_flip() {
        let id = Mat::<c64>::identity(2, 2);
        let choi_id = unitary_choi(id.as_ref());
        let choi_x = unitary_choi(pauli_x().as_ref());
        let d = diamond_norm_distance(choi_id.as_ref(), choi_x.as_ref()).unwrap();
        assert!((d - 2.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn diamond_is_symmetric_and_below_watrous_upper_bound() {
        let a = amplitude_damping_choi(0.2);
        let id = Mat::<c64>::identity(2, 2);
        let b = unitary_choi(id.as_ref());
        let dab = diamond_norm_distance(a.as_ref(), b.as_ref()).unwrap();
        let dba = diamond_norm_distance(b.as_ref(), a.as_ref()).unwrap();
        assert!((dab - dba).abs() < TOL);
        assert!(dab >= 0.0);

        let diff = Mat::from_fn(4, 4, |i, j| a[(i, j)] - b[(i, j)]);
        let (_, upper) = watrous_bounds(diff.as_ref()).unwrap();
        assert!(dab <= upper + TOL, "d={dab} upper={upper}");
    }

    #[test]
    fn amplitude_damping_distance_from_identity() {
        // |1><1| is damped to (gamma, 1 - gamma), which is optimal: 2 gamma
        let gamma = 0.2;
        let ad = amplitude_damping_choi(gamma);
        let id = unitary_choi(Mat::<c64>::identity(2, 2).as_ref());
        let forward = diamond_norm_distance(ad.as_ref(), id.as_ref()).unwrap();
        let backward = diamond_norm_distance(id.as_ref(), ad.as_ref()).unwrap();
        assert!((forward - 2.0 * gamma).abs() < TOL, "forward={forward}");
        assert!((backward - 2.0 * gamma).abs() < TOL, "backward={backward}");
    }

    #[test]
    fn unitary_choi_puts_output_first() {
        // |0> -> |1> under X: the Choi block for input |0><0| sits on output |1><1|
        let choi = unitary_choi(pauli_x().as_ref());
        // index = 2 * output + input
        assert!((choi[(2, 2)].re - 1.0).abs() < TOL);
        assert!((choi[(1, 1)].re - 1.0).abs() < TOL);
        assert!((choi[(1, 2)].re - 1.0).abs() < TOL);
        assert!(choi[(0, 0)].re.abs() < TOL);
        assert!(choi[(3, 3)].re.abs() < TOL);
    }

    #[test]
    fn diamond_two_qubit_identical_channels() {
        let id = Mat::<c64>::identity(2, 2);
        let x_first = kron(pauli_x().as_ref(), id.as_ref());
        let choi = unitary_choi(x_first.as_ref());
        let d = diamond_norm_distance(choi.as_ref(), choi.as_ref()).unwrap();
        assert!(d.abs() < TOL, "d={d}");
    }

    #[test]
    fn diamond_rejects_non_square_dimension() {
        let a = Mat::<c64>::identity(3, 3);
        assert!(matches!(
            diamond_norm_distance(a.as_ref(), a.as_ref()),
            Err(Error::NotPerfectSquare(3, 3))
        ));
    }

    struct FailingSolver;

    impl SdpSolver for FailingSolver {
        fn solve(&self, _: &SdpProblem) -> Result<SdpSolution> {
            Err(Error::Unsolved {
                status: SolveStatus::MaxIterations,
                iterations: 0,
            })
        }
    }

    #[test]
    fn diamond_propagates_solver_failure() {
        let id = Mat::<c64>::identity(4, 4);
        assert!(matches!(
            diamond_norm_distance_with(id.as_ref(), id.as_ref(), &FailingSolver),
            Err(Error::Unsolved { .. })
        ));
    }

    #[test]
    fn watrous_bounds_identity() {
        let id = Mat::<c64>::identity(4, 4);
        let (lower, upper) = watrous_bounds(id.as_ref()).unwrap();
        assert!((lower - 4.0).abs() < TOL);
        assert!((upper - 16.0).abs() < TOL);
    }

    #[test]
    fn watrous_bounds_shape_errors() {
        let rect = Mat::<c64>::zeros(3, 4);
        assert!(matches!(
            watrous_bounds(rect.as_ref()),
            Err(Error::NotPerfectSquare(3, 4))
        ));

        let data: Vec<c64> = (0..16)
            .map(|k| if k % 5 == 0 { c(1.0, 0.0) } else { ZERO })
            .collect();
        assert!(matches!(
            watrous_bounds_shaped(&[16], &data),
            Err(Error::NotAMatrix(1))
        ));
        assert!(matches!(
            watrous_bounds_shaped(&[2, 2, 4], &data),
            Err(Error::NotAMatrix(3))
        ));
        let (lower, upper) = watrous_bounds_shaped(&[4, 4], &data).unwrap();
        assert!((lower - 4.0).abs() < TOL);
        assert!((upper - 16.0).abs() < TOL);
    }
}
