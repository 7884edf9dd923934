//! The synthesis engine: one quantum register plus everything that acts on it

use crate::config::{EngineConfig, HardwareConfig};
use crate::error::{Result, SimError};
use crate::evolution::SchrodingerSolver;
use crate::lorentz::LorentzBoost;
use crate::persistence::{StateArchive, StorageManager, StorageUsage};
use crate::result::{GateLogEntry, MeasurementOutcome, SimulationResult, StateInfo, TopState};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::PI;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use synq_gates::{GateOp, StandardGate};
use synq_state::measurement::{most_likely, sample};
use synq_state::state::check_qubit_count;
use synq_state::{
    bitstring, Accelerator, InitialState, QuantumState, StateError, StorageOptions,
    BYTES_PER_AMPLITUDE, PROBABILITY_EPSILON,
};
use tracing::{debug, info};

/// Number of basis states listed in [`StateInfo::top_states`]
pub const TOP_STATES: usize = 10;

/// The four maximally entangled two-qubit states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BellPair {
    /// (|00⟩ + |11⟩)/√2
    PhiPlus,
    /// (|00⟩ - |11⟩)/√2
    PhiMinus,
    /// (|01⟩ + |10⟩)/√2
    PsiPlus,
    /// (|01⟩ - |10⟩)/√2
    PsiMinus,
}

impl fmt::Display for BellPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BellPair::PhiPlus => "phi+",
            BellPair::PhiMinus => "phi-",
            BellPair::PsiPlus => "psi+",
            BellPair::PsiMinus => "psi-",
        })
    }
}

impl FromStr for BellPair {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phi+" | "phi_plus" => Ok(BellPair::PhiPlus),
            "phi-" | "phi_minus" => Ok(BellPair::PhiMinus),
            "psi+" | "psi_plus" => Ok(BellPair::PsiPlus),
            "psi-" | "psi_minus" => Ok(BellPair::PsiMinus),
            _ => Err(SimError::InvalidArgument(format!("unknown Bell state '{s}'"))),
        }
    }
}

/// Engine-wide summary returned by [`SynthesisEngine::status`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub initialized: bool,
    pub n_qubits: usize,
    pub dimension: usize,
    pub gates_applied: usize,
    pub simulations_run: usize,
    pub backend: String,
    pub hardware: HardwareConfig,
    pub storage: StorageUsage,
}

/// Statevector engine.
///
/// Owns at most one [`QuantumState`], the gate log for that state, a
/// bounded history of evolution results, and the storage root. Every method
/// runs to completion on the caller's thread; share an engine across threads
/// only behind external synchronization.
///
/// # Example
///
/// ```no_run
/// use synq_sim::{EngineConfig, SynthesisEngine};
/// use synq_state::InitialState;
///
/// let mut engine = SynthesisEngine::new(EngineConfig::default().with_seed(1))?;
/// engine.initialize(2, &InitialState::Zero)?;
/// engine.apply_gate("H", &[0], &[], &[])?;
/// engine.apply_gate("CX", &[1], &[0], &[])?;
///
/// let outcome = engine.measure(1000, false)?;
/// assert_eq!(outcome.get("01") + outcome.get("10"), 0);
/// # Ok::<(), synq_sim::SimError>(())
/// ```
#[derive(Debug)]
pub struct SynthesisEngine {
    config: EngineConfig,
    storage: StorageManager,
    accelerator: Accelerator,
    state: Option<QuantumState>,
    gate_log: VecDeque<GateLogEntry>,
    /// Gates applied to the current state, including any evicted from the log
    gate_count: usize,
    history: VecDeque<SimulationResult>,
    simulations_run: usize,
    rng: StdRng,
}

impl SynthesisEngine {
    /// Build an engine and prepare its storage root.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] if `config.validate()` fails, I/O errors
    /// if the storage layout cannot be created.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(SimError::InvalidConfig)?;
        let hardware = &config.hardware;
        let storage = StorageManager::open(
            &hardware.storage_root,
            hardware.max_storage_bytes,
            config.compression_level,
        )?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            max_qubits = hardware.max_qubits,
            max_memory_gb = hardware.max_memory_bytes as f64 / 1e9,
            max_storage_gb = hardware.max_storage_bytes as f64 / 1e9,
            storage = %hardware.storage_root.display(),
            "synthesis engine created"
        );

        Ok(Self {
            accelerator: Accelerator::new(config.backend),
            storage,
            state: None,
            gate_log: VecDeque::with_capacity(config.gate_log_capacity),
            gate_count: 0,
            history: VecDeque::with_capacity(config.history_capacity),
            simulations_run: 0,
            rng,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current register, if any
    pub fn state(&self) -> Option<&QuantumState> {
        self.state.as_ref()
    }

    fn current(&self) -> Result<&QuantumState> {
        self.state.as_ref().ok_or(SimError::NotInitialized)
    }

    fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            scratch_dir: self.storage.cache_dir(),
            ..self.config.hardware.storage_options()
        }
    }

    /// Check that a `num_qubits` register fits the memory or storage budget
    fn check_resources(&self, num_qubits: usize, options: &StorageOptions) -> Result<()> {
        let dimension = 1usize << num_qubits;
        let bytes = dimension * BYTES_PER_AMPLITUDE;
        if options.uses_mmap(dimension) {
            self.storage.check_budget(bytes as u64)
        } else if bytes > options.max_memory_bytes {
            Err(StateError::AllocationError {
                size: bytes,
                limit: options.max_memory_bytes,
            }
            .into())
        } else {
            Ok(())
        }
    }

    /// Replace the register with a fresh `num_qubits` state.
    ///
    /// The previous state is released only once the new one exists, so a
    /// failed call leaves the engine unchanged.
    pub fn initialize(&mut self, num_qubits: usize, mode: &InitialState) -> Result<&QuantumState> {
        check_qubit_count(num_qubits, self.config.hardware.max_qubits)?;
        let options = self.storage_options();
        self.check_resources(num_qubits, &options)?;

        let state = QuantumState::new(num_qubits, mode, &options)?;
        info!(
            num_qubits,
            mode = %mode,
            memory_mapped = state.is_memory_mapped(),
            memory_mb = state.memory_bytes() as f64 / 1e6,
            "state initialized"
        );
        Ok(self.install(state, Vec::new()))
    }

    fn install(&mut self, state: QuantumState, gate_log: Vec<GateLogEntry>) -> &QuantumState {
        if let Some(mut old) = self.state.take() {
            old.cleanup();
        }
        self.gate_count = gate_log.len();
        self.gate_log.clear();
        let skip = gate_log.len().saturating_sub(self.config.gate_log_capacity);
        self.gate_log.extend(gate_log.into_iter().skip(skip));
        self.state.insert(state)
    }

    /// Apply a named gate.
    ///
    /// `name` is matched case-insensitively (`"CNOT"`, `"toffoli"` and the
    /// other aliases work). Nothing is mutated unless the gate, operands and
    /// parameters all validate.
    pub fn apply_gate(
        &mut self,
        name: &str,
        targets: &[usize],
        controls: &[usize],
        params: &[f64],
    ) -> Result<()> {
        let num_qubits = self.current()?.num_qubits();
        let gate: StandardGate = name.parse()?;
        let op = GateOp::lower(gate, targets, controls, params)?;
        op.validate(num_qubits)?;

        self.execute(&op);
        self.record(GateLogEntry {
            gate: gate.name().to_string(),
            targets: targets.to_vec(),
            controls: controls.to_vec(),
            params: params.to_vec(),
        });
        debug!(
            gate = gate.name(),
            ?targets,
            ?controls,
            backend = self.accelerator.backend_name(),
            "gate applied"
        );
        Ok(())
    }

    /// Apply an already lowered operation
    pub fn apply_op(&mut self, op: &GateOp) -> Result<()> {
        let num_qubits = self.current()?.num_qubits();
        op.validate(num_qubits)?;
        self.execute(op);

        let (gate, controls, targets) = match op {
            GateOp::Single { target, .. } => ("U", vec![], vec![*target]),
            GateOp::Controlled {
                control, target, ..
            } => ("CU", vec![*control], vec![*target]),
            GateOp::MultiControlledX { controls, target } => {
                ("MCX", controls.to_vec(), vec![*target])
            }
            GateOp::Swap { a, b } => ("SWAP", vec![], vec![*a, *b]),
            GateOp::ControlledSwap { control, a, b } => ("CSWAP", vec![*control], vec![*a, *b]),
        };
        self.record(GateLogEntry {
            gate: gate.to_string(),
            targets,
            controls,
            params: Vec::new(),
        });
        Ok(())
    }

    fn execute(&mut self, op: &GateOp) {
        let backend = self.accelerator.backend();
        if let Some(state) = self.state.as_mut() {
            let num_qubits = state.num_qubits();
            backend.apply(state.amplitudes_mut(), op, num_qubits);
        }
    }

    fn record(&mut self, entry: GateLogEntry) {
        if self.gate_log.len() == self.config.gate_log_capacity {
            self.gate_log.pop_front();
        }
        self.gate_log.push_back(entry);
        self.gate_count += 1;
    }

    pub fn h(&mut self, qubit: usize) -> Result<()> {
        self.apply_gate("H", &[qubit], &[], &[])
    }

    pub fn x(&mut self, qubit: usize) -> Result<()> {
        self.apply_gate("X", &[qubit], &[], &[])
    }

    pub fn cx(&mut self, control: usize, target: usize) -> Result<()> {
        self.apply_gate("CX", &[target], &[control], &[])
    }

    /// Evolve the register under a time-independent Hamiltonian.
    ///
    /// The final state replaces the register and the result is appended to
    /// the history. A non-Hermitian `hamiltonian` is evolved anyway and the
    /// result carries a [`crate::NumericWarning`].
    ///
    /// # Errors
    ///
    /// [`SimError::NotInitialized`], [`SimError::OperatorDimension`] if H is
    /// not `dimension × dimension`, [`SimError::InvalidArgument`] for
    /// `n_steps` outside `1..=max_time_steps` or a non-finite `t_max`.
    pub fn evolve(
        &mut self,
        hamiltonian: &DMatrix<Complex64>,
        t_max: f64,
        n_steps: usize,
        store_trajectory: bool,
    ) -> Result<SimulationResult> {
        let dimension = self.current()?.dimension();
        let (rows, cols) = hamiltonian.shape();
        if rows != dimension || cols != dimension {
            return Err(SimError::OperatorDimension {
                expected: dimension,
                rows,
                cols,
            });
        }
        let max_steps = self.config.hardware.max_time_steps;
        if n_steps == 0 || n_steps > max_steps {
            return Err(SimError::InvalidArgument(format!(
                "n_steps must be in 1..={max_steps}, got {n_steps}"
            )));
        }

        let solver = SchrodingerSolver::new(hamiltonian.clone())?;
        let result = {
            let state = self.current()?;
            solver.evolve(state.amplitudes(), t_max, n_steps, store_trajectory)?
        };
        if let Some(state) = self.state.as_mut() {
            state.amplitudes_mut().copy_from_slice(&result.final_state);
        }

        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(result.clone());
        self.simulations_run += 1;

        info!(
            dimension,
            n_steps,
            t_max,
            final_energy = result.final_energy(),
            warnings = result.warnings.len(),
            elapsed_ms = result.computation_time.as_secs_f64() * 1e3,
            "evolution finished"
        );
        Ok(result)
    }

    /// Sample `shots` computational-basis measurements.
    ///
    /// With `collapse`, the register becomes the basis state of the last
    /// sample drawn.
    pub fn measure(&mut self, shots: usize, collapse: bool) -> Result<MeasurementOutcome> {
        let state = self.state.as_mut().ok_or(SimError::NotInitialized)?;
        if shots == 0 {
            return Err(SimError::InvalidArgument("shots must be at least 1".to_string()));
        }
        let num_qubits = state.num_qubits();
        let probabilities = state.probabilities();

        let rng = &mut self.rng;
        let sampled = sample(&probabilities, shots, &mut || rng.gen::<f64>())?;
        let (best, best_probability) = most_likely(&probabilities).unwrap_or((0, 0.0));

        let collapsed_to = match sampled.last_outcome {
            Some(outcome) if collapse => {
                state.collapse_to(outcome)?;
                Some(bitstring(outcome, num_qubits))
            }
            _ => None,
        };

        debug!(shots, collapse, distinct = sampled.counts.len(), "measured");
        Ok(MeasurementOutcome {
            counts: sampled.to_bitstring_counts(num_qubits).into_iter().collect(),
            shots,
            probabilities: probability_map(&probabilities, num_qubits),
            most_likely: bitstring(best, num_qubits),
            most_likely_probability: best_probability,
            collapsed_to,
        })
    }

    /// ⟨ψ|O|ψ⟩
    pub fn expectation_value(&self, operator: &DMatrix<Complex64>) -> Result<Complex64> {
        let state = self.current()?;
        let dimension = state.dimension();
        let (rows, cols) = operator.shape();
        if rows != dimension || cols != dimension {
            return Err(SimError::OperatorDimension {
                expected: dimension,
                rows,
                cols,
            });
        }
        // nalgebra stores column-major
        let row_major = operator.transpose();
        Ok(state.expectation_value(row_major.as_slice())?)
    }

    /// Bitstring → probability for every basis state above 1e-10
    pub fn get_probabilities(&self) -> Result<BTreeMap<String, f64>> {
        let state = self.current()?;
        Ok(probability_map(&state.probabilities(), state.num_qubits()))
    }

    pub fn bloch_vector(&self, qubit: usize) -> Result<[f64; 3]> {
        Ok(self.current()?.bloch_vector(qubit)?)
    }

    /// Prepare one of the four Bell states on a fresh two-qubit register
    pub fn create_bell_state(&mut self, pair: BellPair) -> Result<()> {
        self.initialize(2, &InitialState::Zero)?;
        if matches!(pair, BellPair::PhiMinus | BellPair::PsiMinus) {
            self.x(0)?;
        }
        self.h(0)?;
        if matches!(pair, BellPair::PsiPlus | BellPair::PsiMinus) {
            self.x(1)?;
        }
        self.cx(0, 1)
    }

    /// (|0…0⟩ + |1…1⟩)/√2 on `num_qubits` qubits
    pub fn create_ghz_state(&mut self, num_qubits: usize) -> Result<()> {
        if num_qubits < 2 {
            return Err(SimError::InvalidArgument(format!(
                "GHZ state needs at least 2 qubits, got {num_qubits}"
            )));
        }
        self.initialize(num_qubits, &InitialState::Zero)?;
        self.h(0)?;
        for target in 1..num_qubits {
            self.cx(0, target)?;
        }
        Ok(())
    }

    /// Equal superposition of the `num_qubits` single-excitation states
    pub fn create_w_state(&mut self, num_qubits: usize) -> Result<()> {
        if num_qubits < 2 {
            return Err(SimError::InvalidArgument(format!(
                "W state needs at least 2 qubits, got {num_qubits}"
            )));
        }
        self.initialize(num_qubits, &InitialState::Zero)?;
        if let Some(state) = self.state.as_mut() {
            let amplitude = Complex64::new(1.0 / (num_qubits as f64).sqrt(), 0.0);
            let amplitudes = state.amplitudes_mut();
            amplitudes.fill(Complex64::new(0.0, 0.0));
            for qubit in 0..num_qubits {
                amplitudes[1 << (num_qubits - 1 - qubit)] = amplitude;
            }
        }
        Ok(())
    }

    /// Quantum Fourier transform on the leading `num_qubits` qubits (all
    /// qubits when `None`).
    ///
    /// With qubit 0 as the most significant bit this maps |j⟩ to
    /// Σ_k e^{2πijk/N}|k⟩/√N, built from H, CP(π/2^(j-i)) and a final
    /// qubit reversal.
    pub fn quantum_fourier_transform(&mut self, num_qubits: Option<usize>) -> Result<()> {
        let m = self.fourier_width(num_qubits)?;
        for i in 0..m {
            self.h(i)?;
            for j in i + 1..m {
                self.apply_gate("CP", &[i], &[j], &[PI / (1u64 << (j - i)) as f64])?;
            }
        }
        self.reverse_qubits(m)
    }

    /// Inverse of [`SynthesisEngine::quantum_fourier_transform`]
    pub fn inverse_quantum_fourier_transform(&mut self, num_qubits: Option<usize>) -> Result<()> {
        let m = self.fourier_width(num_qubits)?;
        self.reverse_qubits(m)?;
        for i in (0..m).rev() {
            for j in (i + 1..m).rev() {
                self.apply_gate("CP", &[i], &[j], &[-PI / (1u64 << (j - i)) as f64])?;
            }
            self.h(i)?;
        }
        Ok(())
    }

    fn fourier_width(&self, num_qubits: Option<usize>) -> Result<usize> {
        let available = self.current()?.num_qubits();
        let m = num_qubits.unwrap_or(available);
        if m == 0 || m > available {
            return Err(SimError::InvalidArgument(format!(
                "fourier transform width must be in 1..={available}, got {m}"
            )));
        }
        Ok(m)
    }

    fn reverse_qubits(&mut self, m: usize) -> Result<()> {
        for i in 0..m / 2 {
            self.apply_gate("SWAP", &[i, m - 1 - i], &[], &[])?;
        }
        Ok(())
    }

    /// Compute Lorentz factors for `velocity` (fraction of c) and attach
    /// them to the latest evolution result. The register is not touched.
    pub fn apply_lorentz_boost(&mut self, velocity: f64) -> Result<LorentzBoost> {
        let boost = LorentzBoost::new(velocity)?;
        if let Some(latest) = self.history.back_mut() {
            boost.annotate(latest);
        }
        debug!(velocity, gamma = boost.gamma, "lorentz boost");
        Ok(boost)
    }

    /// Save the register and gate log as `states/<name>.qstate`
    pub fn save_state(&self, name: &str) -> Result<PathBuf> {
        let state = self.current()?;
        let archive = StateArchive::from_state(state, self.gate_log.iter().cloned().collect());
        self.storage.save_state(name, &archive)
    }

    /// Replace the register and gate log with a saved state.
    ///
    /// The archive is decoded and validated in full before the live state is
    /// touched.
    pub fn load_state(&mut self, name: &str) -> Result<&QuantumState> {
        let archive = self.storage.load_state(name)?;
        check_qubit_count(archive.n_qubits, self.config.hardware.max_qubits)?;
        let options = self.storage_options();
        self.check_resources(archive.n_qubits, &options)?;
        let state = QuantumState::from_amplitudes(&archive.amplitudes(), &options)?;

        info!(name, n_qubits = archive.n_qubits, gates = archive.gate_log.len(), "state loaded");
        Ok(self.install(state, archive.gate_log))
    }

    /// Save an evolution result as `results/<name>.json.gz`
    pub fn save_result(&self, result: &SimulationResult, name: &str) -> Result<PathBuf> {
        self.storage.save_result(name, result)
    }

    pub fn get_storage_usage(&self) -> Result<StorageUsage> {
        self.storage.usage()
    }

    /// Names of saved states
    pub fn list_saved_states(&self) -> Result<Vec<String>> {
        self.storage.list_states()
    }

    pub fn get_state_info(&self) -> Result<StateInfo> {
        let state = self.current()?;
        let num_qubits = state.num_qubits();
        let amplitudes = state.amplitudes();

        let mut nonzero: Vec<(usize, f64)> = amplitudes
            .iter()
            .map(|a| a.norm_sqr())
            .enumerate()
            .filter(|&(_, p)| p > PROBABILITY_EPSILON)
            .collect();
        nonzero.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let top_states = nonzero
            .iter()
            .take(TOP_STATES)
            .map(|&(index, probability)| TopState {
                bitstring: bitstring(index, num_qubits),
                amplitude: amplitudes[index],
                probability,
            })
            .collect();

        Ok(StateInfo {
            n_qubits: num_qubits,
            dimension: state.dimension(),
            norm: state.norm(),
            memory_bytes: state.memory_bytes(),
            memory_mapped: state.is_memory_mapped(),
            gate_count: self.gate_count,
            nonzero_states: nonzero.len(),
            top_states,
        })
    }

    pub fn status(&self) -> Result<EngineStatus> {
        let storage = self.storage.usage()?;

        Ok(EngineStatus {
            initialized: self.state.is_some(),
            n_qubits: self.state.as_ref().map_or(0, QuantumState::num_qubits),
            dimension: self.state.as_ref().map_or(0, QuantumState::dimension),
            gates_applied: self.gate_count,
            simulations_run: self.simulations_run,
            backend: self.backend_name().to_string(),
            hardware: self.config.hardware.clone(),
            storage,
        })
    }

    /// Selected gate backend, `"not-yet-initialized"` before the first gate
    pub fn backend_name(&self) -> &'static str {
        self.accelerator.backend_name()
    }

    /// Retained gate log entries, oldest first
    pub fn gate_log(&self) -> impl ExactSizeIterator<Item = &GateLogEntry> {
        self.gate_log.iter()
    }

    /// Retained evolution results, oldest first
    pub fn history(&self) -> impl ExactSizeIterator<Item = &SimulationResult> {
        self.history.iter()
    }

    /// Release the register (deleting any mapped file) and clear the gate
    /// log. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
            info!("state released");
        }
        self.gate_log.clear();
        self.gate_count = 0;
    }
}

impl Drop for SynthesisEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn probability_map(probabilities: &[f64], num_qubits: usize) -> BTreeMap<String, f64> {
    probabilities
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p > PROBABILITY_EPSILON)
        .map(|(i, &p)| (bitstring(i, num_qubits), p))
        .collect()
}
