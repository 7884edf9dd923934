//! Error types for state vector operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during state vector operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Qubit count outside the supported range
    #[error("Invalid qubit count {requested}, must be between 1 and {max}")]
    InvalidQubitCount { requested: usize, max: usize },

    /// Invalid qubit index
    #[error("Invalid qubit index {index} for {num_qubits}-qubit state")]
    InvalidQubitIndex { index: usize, num_qubits: usize },

    /// Invalid state dimension
    #[error("Invalid state dimension {dimension}, expected power of 2")]
    InvalidDimension { dimension: usize },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// State not normalized
    #[error("State vector not normalized, norm = {norm}")]
    NotNormalized { norm: f64 },

    /// Basis-state bitstring is malformed or has the wrong width
    #[error("Invalid basis bitstring '{bitstring}' for {num_qubits}-qubit state")]
    InvalidBitstring { bitstring: String, num_qubits: usize },

    /// Initialization mode not recognised
    #[error("Unknown initialization mode '{0}'")]
    UnknownMode(String),

    /// Storage was released by `cleanup`
    #[error("State storage has been released")]
    Released,

    /// In-memory amplitude vector larger than the memory limit
    #[error("Failed to allocate {size} bytes for state vector (limit {limit} bytes)")]
    AllocationError { size: usize, limit: usize },

    /// Backing file for a memory-mapped state could not be created or mapped
    #[error("Memory-mapped storage error at {path:?}: {message}")]
    MappedStorage { path: PathBuf, message: String },
}

/// Result type for state vector operations
pub type Result<T> = std::result::Result<T, StateError>;
