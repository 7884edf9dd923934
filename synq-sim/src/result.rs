//! Result and report types returned by the engine

use crate::lorentz::LorentzBoost;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Time-dependent Schrödinger evolution
    Schrodinger,
}

/// Non-fatal numerical condition recorded on a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericWarning {
    /// H differs from H† by more than the Hermiticity tolerance
    NonHermitian { max_deviation: f64 },
}

impl fmt::Display for NumericWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericWarning::NonHermitian { max_deviation } => write!(
                f,
                "Hamiltonian is not Hermitian (max |H - H†| = {max_deviation:.3e}), results may be unphysical"
            ),
        }
    }
}

/// Parameters of an evolution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionMetadata {
    pub n_steps: usize,
    pub dt: f64,
    pub t_max: f64,
    pub dimension: usize,
    /// (min, max) eigenvalue of H
    pub eigenvalue_range: (f64, f64),
}

/// Output of [`crate::SynthesisEngine::evolve`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub mode: SimulationMode,
    pub initial_state: Vec<Complex64>,
    pub final_state: Vec<Complex64>,
    /// One snapshot per step after the initial state; only when requested
    pub trajectory: Option<Vec<Vec<Complex64>>>,
    /// `n_steps + 1` evenly spaced times from 0 to `t_max`
    pub times: Vec<f64>,
    /// ⟨ψ|H|ψ⟩ after each step
    pub energies: Vec<f64>,
    /// ‖ψ‖ after each step, before the final renormalization
    pub norms: Vec<f64>,
    pub eigenvalues: Vec<f64>,
    pub computation_time: Duration,
    pub memory_used_bytes: usize,
    pub warnings: Vec<NumericWarning>,
    pub metadata: EvolutionMetadata,
    /// Relativistic annotation attached with [`LorentzBoost::annotate`]
    pub relativistic: Option<LorentzBoost>,
}

impl SimulationResult {
    /// Energy after the last step, or 0 for an empty run
    pub fn final_energy(&self) -> f64 {
        self.energies.last().copied().unwrap_or(0.0)
    }

    /// Largest |E_k - E_0| over the recorded steps
    pub fn energy_drift(&self) -> f64 {
        match self.energies.first() {
            Some(&first) => self
                .energies
                .iter()
                .map(|e| (e - first).abs())
                .fold(0.0, f64::max),
            None => 0.0,
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Output of [`crate::SynthesisEngine::measure`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementOutcome {
    /// Bitstring → number of shots that produced it
    pub counts: BTreeMap<String, usize>,
    pub shots: usize,
    /// Born probabilities above 1e-10, keyed by bitstring
    pub probabilities: BTreeMap<String, f64>,
    pub most_likely: String,
    pub most_likely_probability: f64,
    /// Basis state the register collapsed to, when collapse was requested
    pub collapsed_to: Option<String>,
}

impl MeasurementOutcome {
    /// Count for a bitstring (0 when never observed)
    pub fn get(&self, bitstring: &str) -> usize {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Observed frequency of a bitstring
    pub fn frequency(&self, bitstring: &str) -> f64 {
        if self.shots == 0 {
            0.0
        } else {
            self.get(bitstring) as f64 / self.shots as f64
        }
    }

    /// Outcomes sorted by count, descending, ties by bitstring
    pub fn sorted_counts(&self) -> Vec<(&str, usize)> {
        let mut sorted: Vec<_> = self.counts.iter().map(|(bs, &c)| (bs.as_str(), c)).collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        sorted
    }
}

impl fmt::Display for MeasurementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Measurement ({} shots):", self.shots)?;
        for (bitstring, count) in self.sorted_counts() {
            writeln!(
                f,
                "  |{}⟩: {} ({:.2}%)",
                bitstring,
                count,
                100.0 * count as f64 / self.shots.max(1) as f64
            )?;
        }
        write!(
            f,
            "  most likely |{}⟩ (p = {:.4})",
            self.most_likely, self.most_likely_probability
        )
    }
}

/// One applied gate, as recorded in the gate log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateLogEntry {
    pub gate: String,
    pub targets: Vec<usize>,
    pub controls: Vec<usize>,
    pub params: Vec<f64>,
}

/// A basis state with its amplitude, as listed by `get_state_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopState {
    pub bitstring: String,
    pub amplitude: Complex64,
    pub probability: f64,
}

/// Snapshot of the current register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInfo {
    pub n_qubits: usize,
    pub dimension: usize,
    pub norm: f64,
    pub memory_bytes: usize,
    pub memory_mapped: bool,
    pub gate_count: usize,
    pub nonzero_states: usize,
    /// Up to ten most probable basis states, most probable first
    pub top_states: Vec<TopState>,
}
