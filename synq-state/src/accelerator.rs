//! Gate backend selection
//!
//! A [`GateBackend`] applies lowered [`GateOp`]s to an amplitude slice. Two
//! exist: [`ReferenceBackend`] (the plain loops in [`crate::kernels`]) and
//! [`SimdBackend`] (SSE2 arithmetic plus rayon splitting). An [`Accelerator`]
//! probes once, on first use, and keeps whichever backend passed its smoke
//! test, falling back to the reference loops.

use crate::{kernels, simd};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use synq_gates::matrices::HADAMARD;
use synq_gates::{GateOp, Matrix2};

/// Name reported before the first gate has been applied
pub const NOT_YET_INITIALIZED: &str = "not-yet-initialized";

/// Common interface of all gate kernels.
///
/// Callers guarantee `state.len() == 2^num_qubits` and that `op` has been
/// validated against `num_qubits`.
pub trait GateBackend: Send + Sync {
    /// Short identifier, reported in engine status
    fn name(&self) -> &'static str;

    fn apply_single(&self, state: &mut [Complex64], matrix: &Matrix2, target: usize, num_qubits: usize);

    fn apply_controlled(
        &self,
        state: &mut [Complex64],
        matrix: &Matrix2,
        control: usize,
        target: usize,
        num_qubits: usize,
    );

    fn apply_mcx(&self, state: &mut [Complex64], controls: &[usize], target: usize, num_qubits: usize);

    fn apply_swap(&self, state: &mut [Complex64], a: usize, b: usize, num_qubits: usize) {
        kernels::apply_swap(state, a, b, num_qubits);
    }

    fn apply_cswap(&self, state: &mut [Complex64], control: usize, a: usize, b: usize, num_qubits: usize) {
        kernels::apply_cswap(state, control, a, b, num_qubits);
    }

    /// Dispatch a lowered gate to the matching primitive
    fn apply(&self, state: &mut [Complex64], op: &GateOp, num_qubits: usize) {
        match op {
            GateOp::Single { matrix, target } => self.apply_single(state, matrix, *target, num_qubits),
            GateOp::Controlled {
                matrix,
                control,
                target,
            } => self.apply_controlled(state, matrix, *control, *target, num_qubits),
            GateOp::MultiControlledX { controls, target } => {
                self.apply_mcx(state, controls, *target, num_qubits)
            }
            GateOp::Swap { a, b } => self.apply_swap(state, *a, *b, num_qubits),
            GateOp::ControlledSwap { control, a, b } => {
                self.apply_cswap(state, *control, *a, *b, num_qubits)
            }
        }
    }
}

/// Plain scalar loops; the correctness oracle
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceBackend;

impl GateBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn apply_single(&self, state: &mut [Complex64], matrix: &Matrix2, target: usize, num_qubits: usize) {
        kernels::apply_single(state, matrix, target, num_qubits);
    }

    fn apply_controlled(
        &self,
        state: &mut [Complex64],
        matrix: &Matrix2,
        control: usize,
        target: usize,
        num_qubits: usize,
    ) {
        kernels::apply_controlled(state, matrix, control, target, num_qubits);
    }

    fn apply_mcx(&self, state: &mut [Complex64], controls: &[usize], target: usize, num_qubits: usize) {
        kernels::apply_mcx(state, controls, target, num_qubits);
    }
}

/// SSE2 pair arithmetic, parallel over large vectors
#[derive(Debug, Default, Clone, Copy)]
pub struct SimdBackend;

impl SimdBackend {
    /// Whether this CPU can run the backend
    pub fn is_available() -> bool {
        simd::sse2_available()
    }
}

impl GateBackend for SimdBackend {
    fn name(&self) -> &'static str {
        "simd-sse2"
    }

    fn apply_single(&self, state: &mut [Complex64], matrix: &Matrix2, target: usize, num_qubits: usize) {
        simd::apply_single(state, matrix, target, num_qubits);
    }

    fn apply_controlled(
        &self,
        state: &mut [Complex64],
        matrix: &Matrix2,
        control: usize,
        target: usize,
        num_qubits: usize,
    ) {
        simd::apply_controlled(state, matrix, control, target, num_qubits);
    }

    fn apply_mcx(&self, state: &mut [Complex64], controls: &[usize], target: usize, num_qubits: usize) {
        simd::apply_mcx(state, controls, target, num_qubits);
    }
}

static REFERENCE: ReferenceBackend = ReferenceBackend;
static SIMD: SimdBackend = SimdBackend;

/// Which backends the probe may pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Fastest backend that passes its smoke test
    #[default]
    Auto,
    /// Always the reference loops
    Reference,
}

/// Apply H to |0⟩ and check both amplitudes land near 1/√2
fn smoke_test(backend: &dyn GateBackend) -> bool {
    let mut state = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
    backend.apply_single(&mut state, &HADAMARD, 0, 1);
    let expected = std::f64::consts::FRAC_1_SQRT_2;
    state.iter().all(|a| (a.norm() - expected).abs() < 0.01)
}

/// Pick a backend for this process
pub fn probe(preference: BackendPreference) -> &'static dyn GateBackend {
    if preference == BackendPreference::Auto && SimdBackend::is_available() {
        if smoke_test(&SIMD) {
            tracing::debug!(backend = SIMD.name(), "gate backend selected");
            return &SIMD;
        }
        tracing::warn!(backend = SIMD.name(), "backend failed smoke test, falling back");
    }
    tracing::debug!(backend = REFERENCE.name(), "gate backend selected");
    &REFERENCE
}

/// Lazily resolved backend, probed at most once
#[derive(Debug, Default)]
pub struct Accelerator {
    preference: BackendPreference,
    selected: OnceLock<&'static dyn GateBackend>,
}

impl std::fmt::Debug for dyn GateBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Accelerator {
    pub fn new(preference: BackendPreference) -> Self {
        Self {
            preference,
            selected: OnceLock::new(),
        }
    }

    /// The selected backend, probing on the first call
    pub fn backend(&self) -> &'static dyn GateBackend {
        *self.selected.get_or_init(|| probe(self.preference))
    }

    /// Backend name, or [`NOT_YET_INITIALIZED`] before the first probe
    pub fn backend_name(&self) -> &'static str {
        self.selected
            .get()
            .map_or(NOT_YET_INITIALIZED, |backend| backend.name())
    }

    pub fn is_initialized(&self) -> bool {
        self.selected.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use synq_gates::StandardGate;

    #[test]
    fn test_lazy_selection() {
        let accelerator = Accelerator::new(BackendPreference::Auto);
        assert!(!accelerator.is_initialized());
        assert_eq!(accelerator.backend_name(), NOT_YET_INITIALIZED);

        let name = accelerator.backend().name();
        assert!(accelerator.is_initialized());
        assert_eq!(accelerator.backend_name(), name);
        assert!(name == "reference" || name == "simd-sse2");
    }

    #[test]
    fn test_reference_preference() {
        let accelerator = Accelerator::new(BackendPreference::Reference);
        assert_eq!(accelerator.backend().name(), "reference");
    }

    #[test]
    fn test_both_backends_pass_smoke_test() {
        assert!(smoke_test(&REFERENCE));
        assert!(smoke_test(&SIMD));
    }

    #[test]
    fn test_dispatch_matches_reference() {
        let ops = [
            GateOp::lower(StandardGate::Hadamard, &[0], &[], &[]).unwrap(),
            GateOp::lower(StandardGate::CNot, &[2], &[0], &[]).unwrap(),
            GateOp::lower(StandardGate::CPhase, &[1], &[2], &[0.4]).unwrap(),
            GateOp::lower(StandardGate::RotationY, &[1], &[], &[1.1]).unwrap(),
            GateOp::lower(StandardGate::Swap, &[0, 2], &[], &[]).unwrap(),
            GateOp::lower(StandardGate::CSwap, &[1, 2], &[0], &[]).unwrap(),
        ];

        let mut fast = vec![Complex64::new(0.0, 0.0); 8];
        fast[0] = Complex64::new(1.0, 0.0);
        let mut reference = fast.clone();
        for op in &ops {
            SIMD.apply(&mut fast, op, 3);
            REFERENCE.apply(&mut reference, op, 3);
        }
        for (a, b) in fast.iter().zip(&reference) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }
}
