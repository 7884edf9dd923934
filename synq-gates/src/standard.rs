//! The closed set of standard gates

use crate::error::{GateError, Result};
use crate::matrices::{self, Matrix2};
use std::fmt;
use std::str::FromStr;

/// Every gate the engine can apply.
///
/// Gate names arriving from callers are parsed once into this enum; nothing
/// past the engine boundary matches on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardGate {
    Identity,
    Hadamard,
    PauliX,
    PauliY,
    PauliZ,
    S,
    SDagger,
    T,
    TDagger,
    SqrtX,
    SqrtXDagger,
    Phase,
    RotationX,
    RotationY,
    RotationZ,
    CNot,
    CY,
    CZ,
    CH,
    CPhase,
    Swap,
    CSwap,
    /// Multi-controlled X (Toffoli for two controls)
    Mcx,
}

impl StandardGate {
    /// All gates, in declaration order
    pub const ALL: [StandardGate; 23] = [
        StandardGate::Identity,
        StandardGate::Hadamard,
        StandardGate::PauliX,
        StandardGate::PauliY,
        StandardGate::PauliZ,
        StandardGate::S,
        StandardGate::SDagger,
        StandardGate::T,
        StandardGate::TDagger,
        StandardGate::SqrtX,
        StandardGate::SqrtXDagger,
        StandardGate::Phase,
        StandardGate::RotationX,
        StandardGate::RotationY,
        StandardGate::RotationZ,
        StandardGate::CNot,
        StandardGate::CY,
        StandardGate::CZ,
        StandardGate::CH,
        StandardGate::CPhase,
        StandardGate::Swap,
        StandardGate::CSwap,
        StandardGate::Mcx,
    ];

    /// Canonical name, as recorded in gate logs
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::Identity => "I",
            StandardGate::Hadamard => "H",
            StandardGate::PauliX => "X",
            StandardGate::PauliY => "Y",
            StandardGate::PauliZ => "Z",
            StandardGate::S => "S",
            StandardGate::SDagger => "SDG",
            StandardGate::T => "T",
            StandardGate::TDagger => "TDG",
            StandardGate::SqrtX => "SX",
            StandardGate::SqrtXDagger => "SXDG",
            StandardGate::Phase => "P",
            StandardGate::RotationX => "RX",
            StandardGate::RotationY => "RY",
            StandardGate::RotationZ => "RZ",
            StandardGate::CNot => "CX",
            StandardGate::CY => "CY",
            StandardGate::CZ => "CZ",
            StandardGate::CH => "CH",
            StandardGate::CPhase => "CP",
            StandardGate::Swap => "SWAP",
            StandardGate::CSwap => "CSWAP",
            StandardGate::Mcx => "MCX",
        }
    }

    /// Number of angle parameters the gate takes
    pub fn num_params(&self) -> usize {
        match self {
            StandardGate::Phase
            | StandardGate::RotationX
            | StandardGate::RotationY
            | StandardGate::RotationZ
            | StandardGate::CPhase => 1,
            _ => 0,
        }
    }

    /// True for gates that act as one 2×2 matrix on a single target
    pub fn is_single_qubit(&self) -> bool {
        matches!(
            self,
            StandardGate::Identity
                | StandardGate::Hadamard
                | StandardGate::PauliX
                | StandardGate::PauliY
                | StandardGate::PauliZ
                | StandardGate::S
                | StandardGate::SDagger
                | StandardGate::T
                | StandardGate::TDagger
                | StandardGate::SqrtX
                | StandardGate::SqrtXDagger
                | StandardGate::Phase
                | StandardGate::RotationX
                | StandardGate::RotationY
                | StandardGate::RotationZ
        )
    }

    /// Whether the gate is its own inverse
    pub fn is_hermitian(&self) -> bool {
        matches!(
            self,
            StandardGate::Identity
                | StandardGate::Hadamard
                | StandardGate::PauliX
                | StandardGate::PauliY
                | StandardGate::PauliZ
                | StandardGate::CNot
                | StandardGate::CY
                | StandardGate::CZ
                | StandardGate::CH
                | StandardGate::Swap
                | StandardGate::CSwap
                | StandardGate::Mcx
        )
    }

    /// The 2×2 block this gate applies to its target, if it has one.
    ///
    /// Controlled gates return the block applied when their control is set.
    /// SWAP, CSWAP and MCX are pure index permutations and return `None`.
    pub fn matrix(&self, params: &[f64]) -> Result<Option<Matrix2>> {
        self.check_params(params)?;
        let angle = params.first().copied().unwrap_or(0.0);

        let matrix = match self {
            StandardGate::Identity => matrices::IDENTITY,
            StandardGate::Hadamard | StandardGate::CH => matrices::HADAMARD,
            StandardGate::PauliX | StandardGate::CNot => matrices::PAULI_X,
            StandardGate::PauliY | StandardGate::CY => matrices::PAULI_Y,
            StandardGate::PauliZ | StandardGate::CZ => matrices::PAULI_Z,
            StandardGate::S => matrices::S_GATE,
            StandardGate::SDagger => matrices::S_GATE_DAGGER,
            StandardGate::T => matrices::T_GATE,
            StandardGate::TDagger => matrices::T_GATE_DAGGER,
            StandardGate::SqrtX => matrices::SX_GATE,
            StandardGate::SqrtXDagger => matrices::SX_GATE_DAGGER,
            StandardGate::Phase | StandardGate::CPhase => matrices::phase(angle),
            StandardGate::RotationX => matrices::rotation_x(angle),
            StandardGate::RotationY => matrices::rotation_y(angle),
            StandardGate::RotationZ => matrices::rotation_z(angle),
            StandardGate::Swap | StandardGate::CSwap | StandardGate::Mcx => return Ok(None),
        };
        Ok(Some(matrix))
    }

    pub(crate) fn check_params(&self, params: &[f64]) -> Result<()> {
        let expected = self.num_params();
        if params.len() != expected {
            return Err(GateError::ParameterCount {
                gate: self.name(),
                expected,
                actual: params.len(),
            });
        }
        if let Some(&value) = params.iter().find(|p| !p.is_finite()) {
            return Err(GateError::NonFiniteParameter {
                gate: self.name(),
                value,
            });
        }
        Ok(())
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardGate {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        let gate = match s.trim().to_ascii_uppercase().as_str() {
            "I" | "ID" => StandardGate::Identity,
            "H" => StandardGate::Hadamard,
            "X" | "NOT" => StandardGate::PauliX,
            "Y" => StandardGate::PauliY,
            "Z" => StandardGate::PauliZ,
            "S" => StandardGate::S,
            "SDG" | "S†" | "SDAG" => StandardGate::SDagger,
            "T" => StandardGate::T,
            "TDG" | "T†" | "TDAG" => StandardGate::TDagger,
            "SX" | "√X" | "SQRTX" => StandardGate::SqrtX,
            "SXDG" | "√X†" | "SXDAG" => StandardGate::SqrtXDagger,
            "P" | "PHASE" | "U1" => StandardGate::Phase,
            "RX" => StandardGate::RotationX,
            "RY" => StandardGate::RotationY,
            "RZ" => StandardGate::RotationZ,
            "CX" | "CNOT" => StandardGate::CNot,
            "CY" => StandardGate::CY,
            "CZ" => StandardGate::CZ,
            "CH" => StandardGate::CH,
            "CP" | "CPHASE" => StandardGate::CPhase,
            "SWAP" => StandardGate::Swap,
            "CSWAP" | "FREDKIN" => StandardGate::CSwap,
            "MCX" | "CCX" | "TOFFOLI" => StandardGate::Mcx,
            _ => return Err(GateError::UnknownGate(s.to_string())),
        };
        Ok(gate)
    }
}
