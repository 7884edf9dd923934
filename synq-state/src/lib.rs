//! Statevector storage and gate kernels
//!
//! This crate holds the numerical core of the synq engine:
//!
//! - [`AmplitudeStorage`]: the amplitude vector, either in memory or in a
//!   memory-mapped scratch file once it exceeds a size threshold
//! - [`QuantumState`]: a register of 1 to 18 qubits over that storage
//! - [`kernels`] / [`simd`]: in-place gate application with the MSB-first
//!   bit convention (qubit 0 is the most significant bit)
//! - [`Accelerator`]: lazily probed choice of gate backend
//! - [`measurement`]: Born-rule sampling
//!
//! # Example
//!
//! ```
//! use synq_gates::{GateOp, StandardGate};
//! use synq_state::{Accelerator, BackendPreference, InitialState, QuantumState, StorageOptions};
//!
//! let mut state = QuantumState::new(2, &InitialState::Zero, &StorageOptions::default()).unwrap();
//! let accelerator = Accelerator::new(BackendPreference::Auto);
//!
//! let h = GateOp::lower(StandardGate::Hadamard, &[0], &[], &[]).unwrap();
//! let cx = GateOp::lower(StandardGate::CNot, &[1], &[0], &[]).unwrap();
//! accelerator.backend().apply(state.amplitudes_mut(), &h, 2);
//! accelerator.backend().apply(state.amplitudes_mut(), &cx, 2);
//!
//! let probs = state.probabilities();
//! assert!((probs[0b00] - 0.5).abs() < 1e-12);
//! assert!((probs[0b11] - 0.5).abs() < 1e-12);
//! ```

pub mod accelerator;
pub mod error;
pub mod kernels;
pub mod measurement;
pub mod simd;
pub mod state;
pub mod storage;

pub use accelerator::{Accelerator, BackendPreference, GateBackend, ReferenceBackend, SimdBackend};
pub use error::{Result, StateError};
pub use measurement::SamplingResult;
pub use state::{bitstring, InitialState, QuantumState, MAX_QUBITS, PROBABILITY_EPSILON};
pub use storage::{AmplitudeStorage, StorageOptions, BYTES_PER_AMPLITUDE};
