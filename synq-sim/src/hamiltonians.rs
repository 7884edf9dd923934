//! Predefined Hamiltonians (ħ = 1)

use crate::error::{Result, SimError};
use nalgebra::DMatrix;
use num_complex::Complex64;
use synq_state::MAX_QUBITS;

fn real(entries: [f64; 4]) -> DMatrix<Complex64> {
    DMatrix::from_row_slice(2, 2, &entries.map(|re| Complex64::new(re, 0.0)))
}

/// ω·σx/2
pub fn pauli_x(omega: f64) -> DMatrix<Complex64> {
    real([0.0, omega / 2.0, omega / 2.0, 0.0])
}

/// ω·σz/2
pub fn pauli_z(omega: f64) -> DMatrix<Complex64> {
    real([omega / 2.0, 0.0, 0.0, -omega / 2.0])
}

/// ω0·σz/2 + ω1·σx/2: Larmor precession with a transverse drive
pub fn free_precession(omega_0: f64, omega_1: f64) -> DMatrix<Complex64> {
    pauli_z(omega_0) + pauli_x(omega_1)
}

/// Lift a 2x2 single-qubit Hamiltonian to `num_qubits` qubits, acting on
/// `qubit` (qubit 0 is the most significant bit).
pub fn embed_single_qubit(
    hamiltonian: &DMatrix<Complex64>,
    qubit: usize,
    num_qubits: usize,
) -> Result<DMatrix<Complex64>> {
    if hamiltonian.shape() != (2, 2) {
        let (rows, cols) = hamiltonian.shape();
        return Err(SimError::OperatorDimension {
            expected: 2,
            rows,
            cols,
        });
    }
    if num_qubits == 0 || num_qubits > MAX_QUBITS || qubit >= num_qubits {
        return Err(SimError::InvalidArgument(format!(
            "cannot embed on qubit {qubit} of a {num_qubits}-qubit register"
        )));
    }

    let above = DMatrix::<Complex64>::identity(1 << qubit, 1 << qubit);
    let below_dim = 1 << (num_qubits - qubit - 1);
    let below = DMatrix::<Complex64>::identity(below_dim, below_dim);
    Ok(above.kronecker(hamiltonian).kronecker(&below))
}
