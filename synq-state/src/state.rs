//! Quantum register state: qubit count plus amplitude storage

use crate::error::{Result, StateError};
use crate::storage::{AmplitudeStorage, StorageOptions, BYTES_PER_AMPLITUDE};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest register the engine supports
pub const MAX_QUBITS: usize = 18;

/// Amplitudes below this probability count as zero in reports
pub const PROBABILITY_EPSILON: f64 = 1e-10;

/// Starting state for [`QuantumState::new`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    /// |0…0⟩
    Zero,
    /// |1…1⟩
    One,
    /// Uniform superposition, all amplitudes +1/√N
    Plus,
    /// Uniform superposition, amplitude sign (-1)^popcount(i)
    Minus,
    /// A single computational basis state, MSB-first bitstring
    Basis(String),
}

impl InitialState {
    /// Basis state from a bitstring such as `"0110"`
    pub fn basis(bitstring: impl Into<String>) -> Self {
        InitialState::Basis(bitstring.into())
    }
}

impl fmt::Display for InitialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialState::Zero => f.write_str("zero"),
            InitialState::One => f.write_str("one"),
            InitialState::Plus => f.write_str("plus"),
            InitialState::Minus => f.write_str("minus"),
            InitialState::Basis(bits) => f.write_str(bits),
        }
    }
}

impl FromStr for InitialState {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "zero" | "0" => return Ok(InitialState::Zero),
            "one" | "1" => return Ok(InitialState::One),
            "plus" | "+" => return Ok(InitialState::Plus),
            "minus" | "-" => return Ok(InitialState::Minus),
            _ => {}
        }
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b == b'0' || b == b'1') {
            Ok(InitialState::Basis(trimmed.to_string()))
        } else {
            Err(StateError::UnknownMode(s.to_string()))
        }
    }
}

/// Format `index` as an MSB-first bitstring of `num_qubits` characters
pub fn bitstring(index: usize, num_qubits: usize) -> String {
    format!("{:0width$b}", index, width = num_qubits)
}

/// Check a qubit count against `1..=max_qubits`
pub fn check_qubit_count(num_qubits: usize, max_qubits: usize) -> Result<()> {
    if num_qubits == 0 || num_qubits > max_qubits.min(MAX_QUBITS) {
        return Err(StateError::InvalidQubitCount {
            requested: num_qubits,
            max: max_qubits.min(MAX_QUBITS),
        });
    }
    Ok(())
}

/// An n-qubit register.
///
/// Owns its [`AmplitudeStorage`]; dropping the state (or calling
/// [`QuantumState::cleanup`]) releases any memory-mapped backing file.
#[derive(Debug)]
pub struct QuantumState {
    num_qubits: usize,
    storage: AmplitudeStorage,
}

impl QuantumState {
    /// Allocate and initialize a register.
    ///
    /// # Errors
    ///
    /// Fails before allocating if `num_qubits` is outside `1..=18` or a basis
    /// bitstring does not have exactly `num_qubits` binary digits; fails with
    /// an allocation error if the storage cannot be created.
    ///
    /// # Example
    ///
    /// ```
    /// use synq_state::{InitialState, QuantumState, StorageOptions};
    ///
    /// let state = QuantumState::new(2, &InitialState::basis("10"), &StorageOptions::default()).unwrap();
    /// assert_eq!(state.probabilities()[0b10], 1.0);
    /// ```
    pub fn new(num_qubits: usize, mode: &InitialState, options: &StorageOptions) -> Result<Self> {
        check_qubit_count(num_qubits, MAX_QUBITS)?;
        let basis_index = match mode {
            InitialState::Basis(bits) => Some(parse_basis(bits, num_qubits)?),
            _ => None,
        };

        let dimension = 1usize << num_qubits;
        let mut storage = AmplitudeStorage::allocate(dimension, options)?;
        let amplitudes: &mut [Complex64] = &mut storage;

        match mode {
            InitialState::Zero => amplitudes[0] = Complex64::new(1.0, 0.0),
            InitialState::One => amplitudes[dimension - 1] = Complex64::new(1.0, 0.0),
            InitialState::Plus | InitialState::Minus => {
                let value = 1.0 / (dimension as f64).sqrt();
                let alternate = matches!(mode, InitialState::Minus);
                for (i, amp) in amplitudes.iter_mut().enumerate() {
                    let negative = alternate && i.count_ones() % 2 == 1;
                    *amp = Complex64::new(if negative { -value } else { value }, 0.0);
                }
            }
            InitialState::Basis(_) => {
                if let Some(index) = basis_index {
                    amplitudes[index] = Complex64::new(1.0, 0.0);
                }
            }
        }

        Ok(Self {
            num_qubits,
            storage,
        })
    }

    /// Build a register from explicit amplitudes (copied into fresh storage).
    ///
    /// The length must be a power of two with `1..=18` qubits. No
    /// normalization check is made here.
    pub fn from_amplitudes(amplitudes: &[Complex64], options: &StorageOptions) -> Result<Self> {
        let dimension = amplitudes.len();
        if !dimension.is_power_of_two() || dimension < 2 {
            return Err(StateError::InvalidDimension { dimension });
        }
        let num_qubits = dimension.trailing_zeros() as usize;
        check_qubit_count(num_qubits, MAX_QUBITS)?;

        let mut storage = AmplitudeStorage::allocate(dimension, options)?;
        storage.copy_from_slice(amplitudes);
        Ok(Self {
            num_qubits,
            storage,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// 2^num_qubits, or 0 once the storage has been released
    pub fn dimension(&self) -> usize {
        self.storage.len()
    }

    /// Bytes held by the amplitude vector
    pub fn memory_bytes(&self) -> usize {
        self.dimension() * BYTES_PER_AMPLITUDE
    }

    /// True after [`QuantumState::cleanup`]
    pub fn is_released(&self) -> bool {
        self.storage.is_empty()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            return Err(StateError::Released);
        }
        Ok(())
    }

    pub fn is_memory_mapped(&self) -> bool {
        self.storage.is_mapped()
    }

    pub fn storage(&self) -> &AmplitudeStorage {
        &self.storage
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.storage
    }

    pub fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.storage
    }

    /// Born-rule probabilities |ψ_i|²
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes().iter().map(|a| a.norm_sqr()).collect()
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.amplitudes()
            .iter()
            .map(|a| a.norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    /// Rescale to unit norm. A (near) zero vector is left untouched.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > PROBABILITY_EPSILON {
            let inv_norm = 1.0 / norm;
            for amp in self.amplitudes_mut() {
                *amp *= inv_norm;
            }
        }
    }

    pub fn is_normalized(&self, epsilon: f64) -> bool {
        (self.norm() - 1.0).abs() < epsilon
    }

    /// Replace the state with the basis state `index`
    pub fn collapse_to(&mut self, index: usize) -> Result<()> {
        self.ensure_live()?;
        let dimension = self.amplitudes().len();
        if index >= dimension {
            return Err(StateError::DimensionMismatch {
                expected: dimension,
                actual: index,
            });
        }
        let amplitudes = self.amplitudes_mut();
        amplitudes.fill(Complex64::new(0.0, 0.0));
        amplitudes[index] = Complex64::new(1.0, 0.0);
        Ok(())
    }

    /// ⟨ψ|O|ψ⟩ for a dense operator stored row-major (`dimension²` entries)
    pub fn expectation_value(&self, operator: &[Complex64]) -> Result<Complex64> {
        self.ensure_live()?;
        let dimension = self.dimension();
        if operator.len() != dimension * dimension {
            return Err(StateError::DimensionMismatch {
                expected: dimension * dimension,
                actual: operator.len(),
            });
        }
        let amplitudes = self.amplitudes();
        let value = operator
            .chunks_exact(dimension)
            .zip(amplitudes)
            .map(|(row, psi_i)| {
                let o_psi: Complex64 = row.iter().zip(amplitudes).map(|(o, a)| o * a).sum();
                psi_i.conj() * o_psi
            })
            .sum();
        Ok(value)
    }

    /// Bloch vector `(x, y, z)` of one qubit's reduced density matrix
    pub fn bloch_vector(&self, qubit: usize) -> Result<[f64; 3]> {
        self.ensure_live()?;
        if qubit >= self.num_qubits {
            return Err(StateError::InvalidQubitIndex {
                index: qubit,
                num_qubits: self.num_qubits,
            });
        }
        let mask = crate::kernels::qubit_mask(qubit, self.num_qubits);
        let amplitudes = self.amplitudes();

        let mut rho_00 = 0.0;
        let mut rho_11 = 0.0;
        let mut rho_01 = Complex64::new(0.0, 0.0);
        for i in (0..amplitudes.len()).filter(|i| i & mask == 0) {
            let a0 = amplitudes[i];
            let a1 = amplitudes[i | mask];
            rho_00 += a0.norm_sqr();
            rho_11 += a1.norm_sqr();
            rho_01 += a0 * a1.conj();
        }
        Ok([2.0 * rho_01.re, -2.0 * rho_01.im, rho_00 - rho_11])
    }

    /// Release storage, deleting any memory-mapped file. Idempotent.
    pub fn cleanup(&mut self) {
        self.storage.release();
    }
}

fn parse_basis(bits: &str, num_qubits: usize) -> Result<usize> {
    let invalid = || StateError::InvalidBitstring {
        bitstring: bits.to_string(),
        num_qubits,
    };
    if bits.len() != num_qubits {
        return Err(invalid());
    }
    usize::from_str_radix(bits, 2).map_err(|_| invalid())
}
