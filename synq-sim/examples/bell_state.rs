//! Prepare a Bell pair, sample it, evolve one qubit and save the result.
//!
//! Run with `RUST_LOG=debug` to see backend selection and per-gate logs.

use std::f64::consts::PI;
use synq_sim::hamiltonians::{embed_single_qubit, pauli_x};
use synq_sim::{BellPair, EngineConfig, SynthesisEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let root = std::env::temp_dir().join("synq-bell-demo");
    let mut engine = SynthesisEngine::new(EngineConfig::default().with_storage_root(&root).with_seed(7))?;

    engine.create_bell_state(BellPair::PhiPlus)?;
    println!("backend: {}", engine.backend_name());
    println!("{}", engine.measure(10_000, false)?);

    // Rabi-rotate qubit 1 by π: |Φ+⟩ → |Ψ+⟩ up to phase
    let h = embed_single_qubit(&pauli_x(1.0), 1, 2)?;
    let result = engine.evolve(&h, PI, 400, false)?;
    println!(
        "energy {:.6} (drift {:.2e}) after {:?}",
        result.final_energy(),
        result.energy_drift(),
        result.computation_time
    );
    for (bits, p) in engine.get_probabilities()? {
        println!("  P({bits}) = {p:.4}");
    }

    let boost = engine.apply_lorentz_boost(0.8)?;
    println!("gamma at 0.8c: {:.4}", boost.gamma);

    let path = engine.save_state("psi_plus")?;
    println!("saved to {}", path.display());
    let usage = engine.get_storage_usage()?;
    println!(
        "storage: {} bytes in {} files ({:.6}% of allocation)",
        usage.used_bytes, usage.file_count, usage.used_percent
    );

    engine.cleanup();
    Ok(())
}
