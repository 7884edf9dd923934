//! Time evolution under a time-independent Hamiltonian
//!
//! H is diagonalized once, `H = V·Λ·V†`. Each step of size `dt` maps the
//! amplitudes into the eigenbasis, multiplies by `exp(-iλ·dt)` and maps back,
//! so no matrix exponential is ever formed. The state is renormalized once,
//! after the last step.

use crate::error::{Result, SimError};
use crate::result::{EvolutionMetadata, NumericWarning, SimulationMode, SimulationResult};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use num_complex::Complex64;
use std::time::Instant;
use synq_state::BYTES_PER_AMPLITUDE;
use tracing::{debug, warn};

/// Relative tolerance of the Hermiticity check
pub const HERMITIAN_RTOL: f64 = 1e-5;

/// Absolute tolerance of the Hermiticity check
pub const HERMITIAN_ATOL: f64 = 1e-8;

/// Largest |H_ij - conj(H_ji)|, or `None` when H is Hermitian within
/// `|a - b| <= atol + rtol·|b|` elementwise.
pub fn hermiticity_deviation(hamiltonian: &DMatrix<Complex64>) -> Option<f64> {
    let n = hamiltonian.nrows();
    let mut max_deviation: f64 = 0.0;
    let mut hermitian = true;
    for i in 0..n {
        for j in 0..n {
            let a = hamiltonian[(i, j)];
            let b = hamiltonian[(j, i)].conj();
            let deviation = (a - b).norm();
            max_deviation = max_deviation.max(deviation);
            if deviation > HERMITIAN_ATOL + HERMITIAN_RTOL * b.norm() {
                hermitian = false;
            }
        }
    }
    (!hermitian).then_some(max_deviation)
}

/// Eigendecomposition of a Hamiltonian, reusable across runs
#[derive(Debug, Clone)]
pub struct SchrodingerSolver {
    hamiltonian: DMatrix<Complex64>,
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<Complex64>,
    eigenvectors_adjoint: DMatrix<Complex64>,
    warnings: Vec<NumericWarning>,
}

impl SchrodingerSolver {
    /// Diagonalize `hamiltonian`.
    ///
    /// A non-Hermitian input is accepted with a [`NumericWarning`]; only its
    /// lower triangle enters the decomposition.
    ///
    /// # Errors
    ///
    /// [`SimError::OperatorDimension`] for a non-square or empty matrix,
    /// [`SimError::InvalidArgument`] for non-finite entries.
    pub fn new(hamiltonian: DMatrix<Complex64>) -> Result<Self> {
        let (rows, cols) = hamiltonian.shape();
        if rows != cols || rows == 0 {
            return Err(SimError::OperatorDimension {
                expected: rows.max(cols),
                rows,
                cols,
            });
        }
        if hamiltonian.iter().any(|h| !h.re.is_finite() || !h.im.is_finite()) {
            return Err(SimError::InvalidArgument(
                "Hamiltonian contains non-finite entries".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        if let Some(max_deviation) = hermiticity_deviation(&hamiltonian) {
            warn!(max_deviation, "Hamiltonian is not Hermitian, evolution may be non-unitary");
            warnings.push(NumericWarning::NonHermitian { max_deviation });
        }

        let eigen = SymmetricEigen::try_new(hamiltonian.clone(), f64::EPSILON, 0).ok_or_else(|| {
            SimError::InvalidArgument("Hamiltonian eigendecomposition did not converge".to_string())
        })?;
        let eigenvectors_adjoint = eigen.eigenvectors.adjoint();

        Ok(Self {
            hamiltonian,
            eigenvalues: eigen.eigenvalues,
            eigenvectors: eigen.eigenvectors,
            eigenvectors_adjoint,
            warnings,
        })
    }

    pub fn dimension(&self) -> usize {
        self.hamiltonian.nrows()
    }

    /// Eigenvalues in the order returned by the decomposition
    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn warnings(&self) -> &[NumericWarning] {
        &self.warnings
    }

    /// Re(ψ†Hψ)
    pub fn energy(&self, psi: &DVector<Complex64>) -> f64 {
        psi.dotc(&(&self.hamiltonian * psi)).re
    }

    /// Evolve `initial` for `t_max` in `n_steps` equal steps.
    ///
    /// # Errors
    ///
    /// [`SimError::OperatorDimension`] if `initial` does not match H,
    /// [`SimError::InvalidArgument`] if `n_steps == 0` or `t_max` is not finite.
    pub fn evolve(
        &self,
        initial: &[Complex64],
        t_max: f64,
        n_steps: usize,
        store_trajectory: bool,
    ) -> Result<SimulationResult> {
        let dimension = self.dimension();
        if initial.len() != dimension {
            return Err(SimError::OperatorDimension {
                expected: initial.len(),
                rows: dimension,
                cols: dimension,
            });
        }
        if n_steps == 0 {
            return Err(SimError::InvalidArgument("n_steps must be at least 1".to_string()));
        }
        if !t_max.is_finite() {
            return Err(SimError::InvalidArgument(format!("t_max must be finite, got {t_max}")));
        }

        let start = Instant::now();
        let dt = t_max / n_steps as f64;
        let phases: DVector<Complex64> = self
            .eigenvalues
            .map(|lambda| Complex64::from_polar(1.0, -lambda * dt));

        let mut psi = DVector::from_column_slice(initial);
        let mut energies = Vec::with_capacity(n_steps);
        let mut norms = Vec::with_capacity(n_steps);
        let mut trajectory = store_trajectory.then(|| Vec::with_capacity(n_steps));

        for _ in 0..n_steps {
            let coefficients = (&self.eigenvectors_adjoint * &psi).component_mul(&phases);
            psi = &self.eigenvectors * coefficients;

            energies.push(self.energy(&psi));
            norms.push(psi.norm());
            if let Some(snapshots) = trajectory.as_mut() {
                snapshots.push(psi.as_slice().to_vec());
            }
        }

        let norm = psi.norm();
        if norm > 0.0 {
            psi.unscale_mut(norm);
        }

        let times = (0..=n_steps)
            .map(|k| t_max * k as f64 / n_steps as f64)
            .collect();
        let eigenvalues: Vec<f64> = self.eigenvalues.iter().copied().collect();
        let eigenvalue_range = eigenvalues
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
                (lo.min(e), hi.max(e))
            });
        let snapshot_count = trajectory.as_ref().map_or(0, Vec::len);
        let memory_used_bytes =
            (2 + snapshot_count) * dimension * BYTES_PER_AMPLITUDE + 2 * dimension * dimension * BYTES_PER_AMPLITUDE;

        let computation_time = start.elapsed();
        debug!(
            dimension,
            n_steps,
            dt,
            elapsed_ms = computation_time.as_secs_f64() * 1e3,
            "evolution steps complete"
        );

        Ok(SimulationResult {
            mode: SimulationMode::Schrodinger,
            initial_state: initial.to_vec(),
            final_state: psi.as_slice().to_vec(),
            trajectory,
            times,
            energies,
            norms,
            eigenvalues,
            computation_time,
            memory_used_bytes,
            warnings: self.warnings.clone(),
            metadata: EvolutionMetadata {
                n_steps,
                dt,
                t_max,
                dimension,
                eigenvalue_range,
            },
            relativistic: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonians;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_rabi_flip() {
        // H = ω σx / 2 flips |0⟩ to |1⟩ at t = π/ω
        let solver = SchrodingerSolver::new(hamiltonians::pauli_x(1.0)).unwrap();
        let result = solver.evolve(&[c(1.0, 0.0), c(0.0, 0.0)], PI, 200, false).unwrap();

        assert_relative_eq!(result.final_state[0].norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.final_state[1].norm(), 1.0, epsilon = 1e-9);
        assert!(result.warnings.is_empty());
        assert!(result.trajectory.is_none());
    }

    #[test]
    fn test_times_and_diagnostics() {
        let solver = SchrodingerSolver::new(hamiltonians::pauli_z(2.0)).unwrap();
        let result = solver.evolve(&[c(1.0, 0.0), c(0.0, 0.0)], 1.0, 4, true).unwrap();

        assert_eq!(result.times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(result.energies.len(), 4);
        assert_eq!(result.norms.len(), 4);
        assert_eq!(result.trajectory.as_ref().map(Vec::len), Some(4));
        assert_relative_eq!(result.metadata.dt, 0.25);
        assert_relative_eq!(result.metadata.eigenvalue_range.0, -1.0, epsilon = 1e-12);
        assert_relative_eq!(result.metadata.eigenvalue_range.1, 1.0, epsilon = 1e-12);
        // |0⟩ is an eigenstate of σz with eigenvalue ω/2
        for &energy in &result.energies {
            assert_relative_eq!(energy, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_energy_conserved() {
        let solver = SchrodingerSolver::new(hamiltonians::free_precession(1.0, 0.3)).unwrap();
        let initial = [c(0.6, 0.0), c(0.0, 0.8)];
        let result = solver.evolve(&initial, 25.0, 1000, false).unwrap();

        assert!(result.energy_drift() < 1e-6);
        for &norm in &result.norms {
            assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_non_hermitian_warns() {
        let h = DMatrix::from_row_slice(2, 2, &[c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)]);
        assert_eq!(hermiticity_deviation(&h), Some(1.0));
        let solver = SchrodingerSolver::new(h).unwrap();
        assert!(matches!(
            solver.warnings(),
            [NumericWarning::NonHermitian { .. }]
        ));
        let result = solver.evolve(&[c(1.0, 0.0), c(0.0, 0.0)], 1.0, 10, false).unwrap();
        assert!(result.has_warnings());
    }

    #[test]
    fn test_dimension_checks() {
        let rect = DMatrix::from_element(2, 3, c(0.0, 0.0));
        assert!(matches!(
            SchrodingerSolver::new(rect),
            Err(SimError::OperatorDimension { rows: 2, cols: 3, .. })
        ));

        let solver = SchrodingerSolver::new(hamiltonians::pauli_x(1.0)).unwrap();
        let err = solver.evolve(&[c(1.0, 0.0); 4], 1.0, 10, false).unwrap_err();
        assert!(matches!(err, SimError::OperatorDimension { expected: 4, .. }));
        assert!(solver.evolve(&[c(1.0, 0.0), c(0.0, 0.0)], 1.0, 0, false).is_err());
        assert!(solver
            .evolve(&[c(1.0, 0.0), c(0.0, 0.0)], f64::NAN, 1, false)
            .is_err());
    }
}
