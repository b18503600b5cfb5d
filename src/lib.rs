//! # qdist
//!
//! Distance and fidelity measures between quantum states and quantum processes.
//!
//! ## Scope
//!
//! Every function here maps one or two operators to a scalar. States are density matrices
//! (Hermitian, positive semi-definite, trace 1); processes are superoperators given either as
//! Pauli-Liouville matrices or as (un-normalized) Choi matrices.
//!
//! - **States** ([`states`]): purity, fidelity
//!   \(F(\rho, \sigma) = (\operatorname{Tr}\sqrt{\sqrt{\rho}\sigma\sqrt{\rho}})^2\), trace distance,
//!   Bures distance and angle, Hilbert-Schmidt inner product, Smith fidelity, and the total
//!   variation distance between probability vectors.
//! - **Quantum Chernoff bound** ([`chernoff`]):
//!   \(Q(\rho, \sigma) = \min_{0 \le s \le 1} \operatorname{Tr}\rho^s\sigma^{1-s}\).
//! - **Processes** ([`processes`]): entanglement and process fidelity of Pauli-Liouville
//!   matrices, the diamond norm distance of Choi matrices (Watrous's semidefinite program), and
//!   the Watrous bounds on the diamond norm.
//!
//! ## Design Principles
//!
//! - **Views in, scalars out**: operators are passed as `faer::MatRef` and never mutated.
//! - **Explicit validity**: functions expect valid inputs; [`validate_density_matrix`] is a
//!   separate step.
//! - **No unwrap**: numerical failures return [`Result`]. Shape preconditions on superoperators
//!   are programmer errors and panic.
//! - **Swappable solvers**: the diamond norm goes through the [`sdp::SdpSolver`] trait, the
//!   Chernoff bound through [`optimize::BoundedMinimizer`].
//!
//! ## Numerical policy
//!
//! Square roots and fractional powers of Hermitian matrices are taken through an
//! eigendecomposition. Eigenvalues that are negative by less than
//! [`linalg::EIGEN_CLAMP_TOL`] relative to the spectral radius are treated as zero.
//!
//! ## References
//!
//! - Nielsen & Chuang (2010): *Quantum Computation and Quantum Information*.
//! - Audenaert et al. (2007): "The Quantum Chernoff Bound", PRL 98, 160501.
//! - Nielsen (2002): "A simple formula for the average gate fidelity of a quantum dynamical
//!   operation", Phys. Lett. A 303, 249.
//! - Watrous (2009): "Semidefinite programs for completely bounded norms", Theory of
//!   Computing 5, 217.
//!

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod chernoff;
pub mod linalg;
pub mod optimize;
pub mod processes;
pub mod sdp;
pub mod states;
mod validate;

pub use chernoff::{quantum_chernoff_bound, quantum_chernoff_bound_with, ChernoffBound};
pub use faer::complex_native::c64 as Complex64;
pub use processes::{
    diamond_norm_distance, diamond_norm_distance_with, entanglement_fidelity, process_fidelity,
    watrous_bounds, watrous_bounds_shaped,
};
pub use states::{
    bures_angle, bures_distance, fidelity, hilbert_schmidt_ip, purity, smith_fidelity,
    total_variation_distance, trace_distance,
};
pub use validate::validate_density_matrix;

/// Errors for distance and fidelity computations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("matrix is not square: {0}x{1}")]
    NotSquare(usize, usize),

    #[error("dimension mismatch: {0}x{1} vs {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),

    #[error("arrays must be the same length: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("power must be positive (got {0})")]
    NegativePower(f64),

    #[error("power must be less than 2 (got {0})")]
    PowerTooLarge(f64),

    #[error("Watrous bounds only defined for matrices (got a {0}-dimensional array)")]
    NotAMatrix(usize),

    #[error("Choi matrix must have dimensions that are perfect squares (got {0}x{1})")]
    NotPerfectSquare(usize, usize),

    #[error("shape {shape:?} does not match buffer length {len}")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("not Hermitian (symmetry violation > {0})")]
    NotHermitian(f64),

    #[error("trace is not 1.0 (got {0})")]
    InvalidTrace(f64),

    #[error("not positive semi-definite (min eigenvalue {0})")]
    NotPSD(f64),

    #[error("result is not real (imaginary part {0})")]
    ComplexResidue(f64),

    #[error("invalid bounds: [{0}, {1}]")]
    InvalidBounds(f64, f64),

    #[error("objective was not finite anywhere in the search interval")]
    NoFiniteValue,

    #[error("semidefinite program not solved: {status:?} after {iterations} iterations")]
    Unsolved {
        status: sdp::SolveStatus,
        iterations: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
