//! Lowering gate requests onto kernel primitives
//!
//! A request is `(gate, targets, controls, params)`. [`GateOp::lower`] checks
//! its shape and turns it into one of five primitives that the state kernels
//! implement directly. [`GateOp::validate`] then checks the qubit indices
//! against a concrete register size. Both run before any amplitude is touched.

use crate::error::{GateError, Result};
use crate::matrices::{dagger, multiply, Matrix2, IDENTITY, PAULI_X};
use crate::standard::StandardGate;
use smallvec::SmallVec;

/// Largest |U†U - I| entry accepted for a matrix block
pub const UNITARY_TOLERANCE: f64 = 1e-10;

/// Qubit list with inline storage for the common small cases
pub type QubitList = SmallVec<[usize; 4]>;

/// A gate ready for a kernel
#[derive(Debug, Clone, PartialEq)]
pub enum GateOp {
    /// 2×2 matrix on one target
    Single { matrix: Matrix2, target: usize },
    /// 2×2 matrix on `target`, applied only where `control` is 1
    Controlled {
        matrix: Matrix2,
        control: usize,
        target: usize,
    },
    /// X on `target` where every control is 1 (sparse index swap)
    MultiControlledX { controls: QubitList, target: usize },
    /// Exchange two qubits
    Swap { a: usize, b: usize },
    /// Exchange two qubits where `control` is 1
    ControlledSwap { control: usize, a: usize, b: usize },
}

impl GateOp {
    /// Lower a standard gate request.
    ///
    /// Two-qubit controlled gates accept either `controls = [c], targets = [t]`
    /// or `controls = [], targets = [c, t]`. A single-qubit gate given one
    /// control becomes its controlled form; `X` given several becomes MCX.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] on wrong parameter count, non-finite parameters,
    /// operand lists that do not fit the gate, or a repeated qubit.
    pub fn lower(
        gate: StandardGate,
        targets: &[usize],
        controls: &[usize],
        params: &[f64],
    ) -> Result<Self> {
        let block = gate.matrix(params)?;
        let invalid = || GateError::InvalidOperands {
            gate: gate.name(),
            targets: targets.to_vec(),
            controls: controls.to_vec(),
        };

        let op = match gate {
            StandardGate::Mcx => match (controls, targets) {
                ([], [rest @ .., target]) if !rest.is_empty() => GateOp::MultiControlledX {
                    controls: rest.iter().copied().collect(),
                    target: *target,
                },
                ([_, ..], [target]) => GateOp::MultiControlledX {
                    controls: controls.iter().copied().collect(),
                    target: *target,
                },
                _ => return Err(invalid()),
            },
            StandardGate::Swap => match (controls, targets) {
                ([], [a, b]) => GateOp::Swap { a: *a, b: *b },
                ([control], [a, b]) => GateOp::ControlledSwap {
                    control: *control,
                    a: *a,
                    b: *b,
                },
                _ => return Err(invalid()),
            },
            StandardGate::CSwap => match (controls, targets) {
                ([], [control, a, b]) | ([control], [a, b]) => GateOp::ControlledSwap {
                    control: *control,
                    a: *a,
                    b: *b,
                },
                _ => return Err(invalid()),
            },
            StandardGate::CNot => match (controls, targets) {
                ([], [control, target]) | ([control], [target]) => GateOp::MultiControlledX {
                    controls: std::iter::once(*control).collect(),
                    target: *target,
                },
                _ => return Err(invalid()),
            },
            StandardGate::CY | StandardGate::CZ | StandardGate::CH | StandardGate::CPhase => {
                let matrix = block.ok_or_else(invalid)?;
                match (controls, targets) {
                    ([], [control, target]) | ([control], [target]) => GateOp::Controlled {
                        matrix,
                        control: *control,
                        target: *target,
                    },
                    _ => return Err(invalid()),
                }
            }
            _ => {
                let matrix = block.ok_or_else(invalid)?;
                match (controls, targets) {
                    ([], [target]) => GateOp::Single {
                        matrix,
                        target: *target,
                    },
                    ([control], [target]) => GateOp::Controlled {
                        matrix,
                        control: *control,
                        target: *target,
                    },
                    ([_, _, ..], [target]) if matrix == PAULI_X => GateOp::MultiControlledX {
                        controls: controls.iter().copied().collect(),
                        target: *target,
                    },
                    _ => return Err(invalid()),
                }
            }
        };

        op.check_distinct()?;
        Ok(op)
    }

    /// Every qubit this operation touches, controls first
    pub fn qubits(&self) -> QubitList {
        match self {
            GateOp::Single { target, .. } => std::iter::once(*target).collect(),
            GateOp::Controlled {
                control, target, ..
            } => [*control, *target].into_iter().collect(),
            GateOp::MultiControlledX { controls, target } => {
                let mut qubits = controls.clone();
                qubits.push(*target);
                qubits
            }
            GateOp::Swap { a, b } => [*a, *b].into_iter().collect(),
            GateOp::ControlledSwap { control, a, b } => [*control, *a, *b].into_iter().collect(),
        }
    }

    /// Check that every qubit is inside an `num_qubits` register, that
    /// no qubit is used twice and that any matrix block is unitary.
    pub fn validate(&self, num_qubits: usize) -> Result<()> {
        if let Some(&qubit) = self.qubits().iter().find(|&&q| q >= num_qubits) {
            return Err(GateError::QubitOutOfRange { qubit, num_qubits });
        }
        self.check_distinct()?;
        self.check_unitary()
    }

    fn check_unitary(&self) -> Result<()> {
        let matrix = match self {
            GateOp::Single { matrix, .. } | GateOp::Controlled { matrix, .. } => matrix,
            _ => return Ok(()),
        };
        if !matrix.iter().flatten().all(|c| c.is_finite()) {
            return Err(GateError::NonUnitary {
                deviation: f64::INFINITY,
            });
        }
        let product = multiply(&dagger(matrix), matrix);
        let deviation = (0..2)
            .flat_map(|i| (0..2).map(move |j| (i, j)))
            .map(|(i, j)| (product[i][j] - IDENTITY[i][j]).norm())
            .fold(0.0, f64::max);
        if deviation <= UNITARY_TOLERANCE {
            Ok(())
        } else {
            Err(GateError::NonUnitary { deviation })
        }
    }

    fn check_distinct(&self) -> Result<()> {
        let qubits = self.qubits();
        for (i, qubit) in qubits.iter().enumerate() {
            if qubits[i + 1..].contains(qubit) {
                return Err(GateError::DuplicateQubit { qubit: *qubit });
            }
        }
        Ok(())
    }
}
