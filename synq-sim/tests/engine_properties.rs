//! End-to-end properties of the synthesis engine

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use num_complex::Complex64;
use proptest::prelude::*;
use synq_sim::hamiltonians::{embed_single_qubit, free_precession, pauli_x, pauli_z};
use synq_sim::{
    BellPair, EngineConfig, ErrorCategory, HardwareConfig, NumericWarning, SimError,
    SynthesisEngine,
};
use synq_state::{BackendPreference, InitialState};
use tempfile::TempDir;

fn engine(dir: &TempDir) -> SynthesisEngine {
    SynthesisEngine::new(EngineConfig::deterministic(dir.path())).unwrap()
}

fn bell(engine: &mut SynthesisEngine) {
    engine.initialize(2, &InitialState::Zero).unwrap();
    engine.apply_gate("H", &[0], &[], &[]).unwrap();
    engine.apply_gate("CX", &[1], &[0], &[]).unwrap();
}

#[test]
fn bell_state_probabilities() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    bell(&mut engine);

    let probs = engine.get_probabilities().unwrap();
    assert_eq!(probs.len(), 2);
    assert_relative_eq!(probs["00"], 0.5, epsilon = 1e-9);
    assert_relative_eq!(probs["11"], 0.5, epsilon = 1e-9);

    let amplitudes = engine.state().unwrap().amplitudes();
    assert_eq!(amplitudes[0b01], Complex64::new(0.0, 0.0));
    assert_eq!(amplitudes[0b10], Complex64::new(0.0, 0.0));
}

#[test]
fn ghz_state_probabilities() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.initialize(3, &InitialState::Zero).unwrap();
    engine.h(0).unwrap();
    engine.cx(0, 1).unwrap();
    engine.cx(0, 2).unwrap();

    let probs = engine.get_probabilities().unwrap();
    assert_eq!(probs.len(), 2);
    assert_relative_eq!(probs["000"], 0.5, epsilon = 1e-9);
    assert_relative_eq!(probs["111"], 0.5, epsilon = 1e-9);

    engine.create_ghz_state(5).unwrap();
    let probs = engine.get_probabilities().unwrap();
    assert_relative_eq!(probs["00000"], 0.5, epsilon = 1e-9);
    assert_relative_eq!(probs["11111"], 0.5, epsilon = 1e-9);
}

#[test]
fn reset_yields_ground_state() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    for n in 1..=18 {
        engine.initialize(n, &InitialState::Plus).unwrap();
        let state = engine.initialize(n, &InitialState::Zero).unwrap();
        let amplitudes = state.amplitudes();
        assert_eq!(amplitudes.len(), 1 << n);
        assert_eq!(amplitudes[0], Complex64::new(1.0, 0.0));
        assert!(amplitudes[1..].iter().all(|a| a.re == 0.0 && a.im == 0.0));
    }
}

#[test]
fn qubit_count_validated_before_mutation() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    bell(&mut engine);

    for n in [0, 19, 64] {
        let err = engine.initialize(n, &InitialState::Zero).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
    let err = engine.initialize(3, &InitialState::basis("01")).unwrap_err();
    assert!(err.is_validation());

    // the Bell state survives every rejected call
    assert_eq!(engine.state().unwrap().num_qubits(), 2);
    assert_relative_eq!(engine.get_probabilities().unwrap()["11"], 0.5, epsilon = 1e-12);
}

#[test]
fn invalid_gates_leave_state_untouched() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    bell(&mut engine);
    let before = engine.state().unwrap().amplitudes().to_vec();

    let rejected: [(&str, &[usize], &[usize], &[f64]); 6] = [
        ("FOO", &[0], &[], &[]),
        ("CX", &[1], &[1], &[]),
        ("H", &[2], &[], &[]),
        ("RX", &[0], &[], &[]),
        ("RX", &[0], &[], &[f64::NAN]),
        ("MCX", &[0], &[1, 0], &[]),
    ];
    for (name, targets, controls, params) in rejected {
        let err = engine.apply_gate(name, targets, controls, params).unwrap_err();
        assert!(err.is_validation(), "{name}: {err}");
    }

    assert_eq!(engine.state().unwrap().amplitudes(), before.as_slice());
    assert_eq!(engine.gate_log().len(), 2);
}

#[test]
fn mcx_flips_only_when_all_controls_set() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    for basis in 0..8usize {
        let bits = format!("{basis:03b}");
        engine.initialize(3, &InitialState::basis(bits.as_str())).unwrap();
        engine.apply_gate("MCX", &[2], &[0, 1], &[]).unwrap();

        let expected = match basis {
            0b110 => 0b111,
            0b111 => 0b110,
            other => other,
        };
        let probs = engine.state().unwrap().probabilities();
        assert_eq!(probs[expected], 1.0, "input |{bits}⟩");
    }

    // superposition: only the 11x pair is exchanged
    engine.initialize(3, &InitialState::Plus).unwrap();
    engine.apply_gate("RZ", &[2], &[], &[0.4]).unwrap();
    let before = engine.state().unwrap().amplitudes().to_vec();
    engine.apply_gate("toffoli", &[2], &[0, 1], &[]).unwrap();
    let after = engine.state().unwrap().amplitudes();
    for i in 0..6 {
        assert_eq!(after[i], before[i]);
    }
    assert_eq!(after[0b110], before[0b111]);
    assert_eq!(after[0b111], before[0b110]);
}

#[test]
fn measurement_statistics_within_three_sigma() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    bell(&mut engine);

    let shots = 100_000;
    let outcome = engine.measure(shots, false).unwrap();
    let zeros = outcome.get("00") as f64;
    let ones = outcome.get("11") as f64;

    assert_eq!(outcome.get("01"), 0);
    assert_eq!(outcome.get("10"), 0);
    assert_eq!(zeros + ones, shots as f64);
    // binomial(n, 1/2): sigma = sqrt(n)/2
    let sigma = (shots as f64).sqrt() / 2.0;
    assert!((zeros - shots as f64 / 2.0).abs() < 3.0 * sigma, "00 = {zeros}");
    assert!(outcome.probabilities.len() == 2);
    assert!(outcome.most_likely == "00" || outcome.most_likely == "11");
    assert_relative_eq!(outcome.most_likely_probability, 0.5, epsilon = 1e-9);
    assert!(outcome.collapsed_to.is_none());
}

#[test]
fn seeded_measurement_is_reproducible() {
    let run = || {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::deterministic(dir.path()).with_seed(1234);
        let mut engine = SynthesisEngine::new(config).unwrap();
        engine.initialize(4, &InitialState::Plus).unwrap();
        engine.measure(500, false).unwrap().counts
    };
    assert_eq!(run(), run());
}

#[test]
fn persistence_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.initialize(4, &InitialState::Zero).unwrap();
    engine.apply_gate("H", &[0], &[], &[]).unwrap();
    engine.apply_gate("RY", &[1], &[], &[0.3]).unwrap();
    engine.apply_gate("CP", &[3], &[0], &[1.2]).unwrap();
    engine.apply_gate("CSWAP", &[2, 3], &[0], &[]).unwrap();
    let saved = engine.state().unwrap().amplitudes().to_vec();

    let path = engine.save_state("snapshot").unwrap();
    assert!(path.ends_with("states/snapshot.qstate"));

    engine.initialize(2, &InitialState::One).unwrap();
    engine.load_state("snapshot").unwrap();

    let loaded = engine.state().unwrap().amplitudes();
    assert_eq!(loaded.len(), saved.len());
    for (a, b) in loaded.iter().zip(&saved) {
        assert!((a - b).norm() < 1e-10);
    }
    assert_eq!(engine.gate_log().len(), 4);
    assert_eq!(engine.gate_log().next().unwrap().gate, "H");
    assert_eq!(engine.list_saved_states().unwrap(), vec!["snapshot".to_string()]);
}

#[test]
fn missing_state_is_not_found() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    bell(&mut engine);

    let err = engine.load_state("never-saved").unwrap_err();
    assert!(matches!(err, SimError::StateNotFound { .. }));
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert_eq!(engine.state().unwrap().num_qubits(), 2);
}

#[test]
fn failed_load_keeps_live_state() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    bell(&mut engine);
    std::fs::write(dir.path().join("states").join("broken.qstate"), b"\x1f\x8bgarbage").unwrap();

    let err = engine.load_state("broken").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Io);
    assert_relative_eq!(engine.get_probabilities().unwrap()["00"], 0.5, epsilon = 1e-12);
    assert_eq!(engine.gate_log().len(), 2);
}

#[test]
fn storage_budget_enforced() {
    let dir = TempDir::new().unwrap();
    let hardware = HardwareConfig::default()
        .with_storage_root(dir.path())
        .with_max_storage_bytes(64);
    let config = EngineConfig::deterministic(dir.path()).with_hardware(hardware);
    let mut engine = SynthesisEngine::new(config).unwrap();
    engine.initialize(6, &InitialState::Plus).unwrap();

    let err = engine.save_state("too-big").unwrap_err();
    assert!(matches!(err, SimError::StorageExceeded { .. }));
    assert_eq!(err.category(), ErrorCategory::Resource);
    assert!(!dir.path().join("states").join("too-big.qstate").exists());

    let usage = engine.get_storage_usage().unwrap();
    assert_eq!(usage.allocated_bytes, 64);
    assert_eq!(usage.available_bytes, 0);
}

#[test]
fn memory_limit_enforced() {
    let dir = TempDir::new().unwrap();
    let hardware = HardwareConfig::default()
        .with_storage_root(dir.path())
        .with_max_memory_bytes(1024);
    let config = EngineConfig::deterministic(dir.path()).with_hardware(hardware);
    let mut engine = SynthesisEngine::new(config).unwrap();

    engine.initialize(6, &InitialState::Zero).unwrap();
    let err = engine.initialize(7, &InitialState::Zero).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
    assert_eq!(engine.state().unwrap().num_qubits(), 6);
}

#[test]
fn memory_mapped_state_released() {
    let dir = TempDir::new().unwrap();
    let hardware = HardwareConfig::default()
        .with_storage_root(dir.path())
        .with_mmap_threshold_bytes(0);
    let config = EngineConfig::deterministic(dir.path()).with_hardware(hardware);
    let mut engine = SynthesisEngine::new(config).unwrap();

    engine.initialize(5, &InitialState::Zero).unwrap();
    engine.h(0).unwrap();
    engine.cx(0, 4).unwrap();
    let info = engine.get_state_info().unwrap();
    assert!(info.memory_mapped);
    assert_relative_eq!(info.norm, 1.0, epsilon = 1e-12);

    let backing = engine
        .state()
        .unwrap()
        .storage()
        .backing_path()
        .unwrap()
        .to_path_buf();
    assert!(backing.starts_with(dir.path().join("cache")));
    assert!(backing.exists());

    engine.cleanup();
    assert!(!backing.exists());
    drop(engine);
}

#[test]
fn energy_conserved_during_evolution() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.initialize(3, &InitialState::basis("010")).unwrap();
    engine.h(0).unwrap();

    let mut h = DMatrix::<Complex64>::zeros(8, 8);
    for q in 0..3 {
        h += embed_single_qubit(&free_precession(1.0 + q as f64, 0.25), q, 3).unwrap();
    }
    let result = engine.evolve(&h, 10.0, 2000, false).unwrap();

    let first = result.energies[0];
    for &energy in &result.energies {
        assert!((energy - first).abs() < 1e-6);
    }
    assert_eq!(result.times.len(), 2001);
    assert_eq!(result.metadata.n_steps, 2000);
    assert!(!result.has_warnings());
    assert_relative_eq!(engine.state().unwrap().norm(), 1.0, epsilon = 1e-12);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn evolution_validates_inputs() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let err = engine.evolve(&pauli_x(1.0), 1.0, 10, false).unwrap_err();
    assert!(matches!(err, SimError::NotInitialized));

    engine.initialize(2, &InitialState::Zero).unwrap();
    let err = engine.evolve(&pauli_x(1.0), 1.0, 10, false).unwrap_err();
    assert!(matches!(
        err,
        SimError::OperatorDimension {
            expected: 4,
            rows: 2,
            cols: 2
        }
    ));

    let h = embed_single_qubit(&pauli_z(1.0), 0, 2).unwrap();
    assert!(engine.evolve(&h, 1.0, 0, false).unwrap_err().is_validation());
    assert!(engine.evolve(&h, 1.0, 100_001, false).unwrap_err().is_validation());
    assert!(engine.history().len() == 0);
}

#[test]
fn non_hermitian_evolution_warns() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.initialize(1, &InitialState::Zero).unwrap();

    let h = DMatrix::from_row_slice(
        2,
        2,
        &[
            Complex64::new(1.0, 0.0),
            Complex64::new(0.5, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(-1.0, 0.0),
        ],
    );
    let result = engine.evolve(&h, 1.0, 50, true).unwrap();
    assert!(matches!(
        result.warnings.as_slice(),
        [NumericWarning::NonHermitian { .. }]
    ));
    assert_eq!(result.trajectory.map(|t| t.len()), Some(50));
}

#[test]
fn lorentz_boost_factors() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let boost = engine.apply_lorentz_boost(0.8).unwrap();
    assert_relative_eq!(boost.gamma, 1.6667, epsilon = 1e-4);
    assert_relative_eq!(boost.length_contraction, 0.6, epsilon = 1e-12);
    assert_eq!(engine.apply_lorentz_boost(0.0).unwrap().gamma, 1.0);

    for v in [1.0, -1.0, 2.5] {
        assert!(engine.apply_lorentz_boost(v).unwrap_err().is_validation());
    }
}

#[test]
fn result_saved_as_compressed_json() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.initialize(1, &InitialState::Zero).unwrap();
    let result = engine.evolve(&pauli_x(2.0), 1.0, 20, false).unwrap();

    let path = engine.save_result(&result, "rabi").unwrap();
    assert!(path.ends_with("results/rabi.json.gz"));

    let file = std::fs::File::open(&path).unwrap();
    let decoded: serde_json::Value =
        serde_json::from_reader(flate2::read::GzDecoder::new(file)).unwrap();
    assert_eq!(decoded["metadata"]["n_steps"], 20);
    assert_eq!(decoded["mode"], "schrodinger");

    assert!(engine.save_result(&result, "../escape").unwrap_err().is_validation());
}

#[test]
fn state_info_and_status() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.create_bell_state(BellPair::PhiPlus).unwrap();

    let info = engine.get_state_info().unwrap();
    assert_eq!(info.n_qubits, 2);
    assert_eq!(info.dimension, 4);
    assert_eq!(info.memory_bytes, 64);
    assert_eq!(info.gate_count, 2);
    assert_eq!(info.nonzero_states, 2);
    assert_eq!(info.top_states[0].bitstring, "00");
    assert_eq!(info.top_states[1].bitstring, "11");

    let status = engine.status().unwrap();
    assert!(status.initialized);
    assert_eq!(status.gates_applied, 2);
    assert_eq!(status.backend, "reference");
    assert_eq!(status.storage.path, dir.path());
}

#[test]
fn auto_backend_matches_reference() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let mut auto = SynthesisEngine::new(
        EngineConfig::deterministic(dir_a.path()).with_backend(BackendPreference::Auto),
    )
    .unwrap();
    let mut reference = engine(&dir_b);

    for engine in [&mut auto, &mut reference] {
        engine.initialize(15, &InitialState::Zero).unwrap();
        for q in 0..15 {
            engine.apply_gate("RY", &[q], &[], &[0.1 * (q + 1) as f64]).unwrap();
        }
        engine.apply_gate("CP", &[14], &[0], &[0.9]).unwrap();
        engine.apply_gate("CCX", &[7], &[2, 11], &[]).unwrap();
    }

    let a = auto.state().unwrap().amplitudes();
    let b = reference.state().unwrap().amplitudes();
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).norm() < 1e-10);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: named gate sequences keep the register normalized
    #[test]
    fn engine_gates_preserve_norm(
        num_qubits in 2usize..=10,
        steps in prop::collection::vec((0usize..8, 0usize..64, 0usize..64, -3.2f64..3.2), 1..30),
    ) {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        engine.initialize(num_qubits, &InitialState::Zero).unwrap();

        for (kind, a, b, angle) in steps {
            let t = a % num_qubits;
            let c = (t + 1 + b % (num_qubits - 1)) % num_qubits;
            match kind {
                0 => engine.apply_gate("H", &[t], &[], &[]),
                1 => engine.apply_gate("RX", &[t], &[], &[angle]),
                2 => engine.apply_gate("T", &[t], &[], &[]),
                3 => engine.apply_gate("CNOT", &[t], &[c], &[]),
                4 => engine.apply_gate("CY", &[t], &[c], &[]),
                5 => engine.apply_gate("CP", &[t], &[c], &[angle]),
                6 => engine.apply_gate("SWAP", &[t, c], &[], &[]),
                _ => engine.apply_gate("SXDG", &[t], &[], &[]),
            }
            .unwrap();
            let norm = engine.state().unwrap().norm();
            prop_assert!((norm - 1.0).abs() < 1e-9);
        }
    }
}
