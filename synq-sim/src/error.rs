//! Error types for the synthesis engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors returned by [`crate::SynthesisEngine`]
#[derive(Error, Debug)]
pub enum SimError {
    /// Engine configuration rejected by `validate()`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Gate name, operands or parameters rejected
    #[error("Invalid gate: {0}")]
    Gate(#[from] synq_gates::GateError),

    /// State construction rejected (qubit count, mode, dimension)
    #[error("Invalid state: {0}")]
    State(#[from] synq_state::StateError),

    /// Hamiltonian or operator size does not match the state
    #[error("Operator dimension mismatch: expected {expected}x{expected}, got {rows}x{cols}")]
    OperatorDimension {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    /// Bad argument to a numerical routine
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Velocity outside the open interval (-1, 1)
    #[error("Velocity must satisfy |v/c| < 1, got {0}")]
    InvalidVelocity(f64),

    /// State-dependent call before `initialize`
    #[error("No quantum state initialized")]
    NotInitialized,

    /// Write would exceed the fixed storage allocation
    #[error("Storage allocation exceeded: need {required} bytes, {available} bytes available")]
    StorageExceeded { required: u64, available: u64 },

    /// Named archive does not exist
    #[error("Saved state not found: {name}")]
    StateNotFound { name: String },

    /// Archive decoded but failed validation
    #[error("Corrupt archive {path:?}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    /// Encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, rejected before any mutation
    Validation,
    /// No state exists yet
    NotInitialized,
    /// Memory or storage limits
    Resource,
    /// Missing saved state
    NotFound,
    /// Filesystem or archive decoding
    Io,
}

impl SimError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SimError::InvalidConfig(_)
            | SimError::Gate(_)
            | SimError::OperatorDimension { .. }
            | SimError::InvalidArgument(_)
            | SimError::InvalidVelocity(_) => ErrorCategory::Validation,
            SimError::State(err) => match err {
                synq_state::StateError::AllocationError { .. } => ErrorCategory::Resource,
                synq_state::StateError::MappedStorage { .. } => ErrorCategory::Io,
                synq_state::StateError::Released => ErrorCategory::NotInitialized,
                _ => ErrorCategory::Validation,
            },
            SimError::NotInitialized => ErrorCategory::NotInitialized,
            SimError::StorageExceeded { .. } => ErrorCategory::Resource,
            SimError::StateNotFound { .. } => ErrorCategory::NotFound,
            SimError::CorruptArchive { .. } | SimError::Serialization(_) | SimError::Io(_) => {
                ErrorCategory::Io
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

impl From<bincode::Error> for SimError {
    fn from(err: bincode::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(SimError::NotInitialized.category(), ErrorCategory::NotInitialized);
        assert_eq!(SimError::InvalidVelocity(1.0).category(), ErrorCategory::Validation);
        assert_eq!(
            SimError::StorageExceeded {
                required: 10,
                available: 5
            }
            .category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            SimError::StateNotFound { name: "x".into() }.category(),
            ErrorCategory::NotFound
        );
        let alloc = SimError::from(synq_state::StateError::AllocationError { size: 10, limit: 1 });
        assert_eq!(alloc.category(), ErrorCategory::Resource);
        let count = SimError::from(synq_state::StateError::InvalidQubitCount {
            requested: 30,
            max: 18,
        });
        assert!(count.is_validation());
        assert_eq!(
            SimError::from(synq_state::StateError::Released).category(),
            ErrorCategory::NotInitialized
        );
        assert!(SimError::from(synq_gates::GateError::NonUnitary { deviation: 0.5 }).is_validation());
    }

    #[test]
    fn test_display() {
        let err = SimError::OperatorDimension {
            expected: 4,
            rows: 2,
            cols: 2,
        };
        assert_eq!(
            err.to_string(),
            "Operator dimension mismatch: expected 4x4, got 2x2"
        );
        assert_eq!(SimError::NotInitialized.to_string(), "No quantum state initialized");
    }
}
