//! Gate library for the synq statevector engine
//!
//! This crate owns the gate vocabulary: constant 2×2 matrices, the closed
//! [`StandardGate`] enumeration parsed from caller-supplied names, and
//! [`GateOp`], the lowered form consumed by the state kernels.
//!
//! # Example
//!
//! ```
//! use synq_gates::{GateOp, StandardGate};
//!
//! let gate: StandardGate = "cnot".parse().unwrap();
//! let op = GateOp::lower(gate, &[1], &[0], &[]).unwrap();
//! op.validate(2).unwrap();
//! assert_eq!(op.qubits().as_slice(), &[0, 1]);
//! ```

pub mod error;
pub mod matrices;
pub mod op;
pub mod standard;

pub use error::{GateError, Result};
pub use matrices::Matrix2;
pub use op::{GateOp, QubitList};
pub use standard::StandardGate;
