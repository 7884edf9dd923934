//! Error types for gate parsing and lowering

use thiserror::Error;

/// Errors raised while turning a gate request into a [`crate::GateOp`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    /// Gate name not in the standard set
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// Wrong number of parameters
    #[error("Gate {gate} expects {expected} parameter(s), got {actual}")]
    ParameterCount {
        gate: &'static str,
        expected: usize,
        actual: usize,
    },

    /// NaN or infinite parameter
    #[error("Gate {gate} received non-finite parameter {value}")]
    NonFiniteParameter { gate: &'static str, value: f64 },

    /// Target/control lists do not fit the gate's shape
    #[error("Gate {gate} cannot act on targets {targets:?} with controls {controls:?}")]
    InvalidOperands {
        gate: &'static str,
        targets: Vec<usize>,
        controls: Vec<usize>,
    },

    /// Qubit index outside the register
    #[error("Invalid qubit index {qubit} for {num_qubits}-qubit state")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },

    /// A matrix block fails U†U = I
    #[error("Gate matrix is not unitary (max deviation {deviation:e})")]
    NonUnitary { deviation: f64 },

    /// The same qubit appears twice among a gate's operands
    #[error("Qubit {qubit} used more than once in a single gate")]
    DuplicateQubit { qubit: usize },
}

/// Result type for gate operations
pub type Result<T> = std::result::Result<T, GateError>;
