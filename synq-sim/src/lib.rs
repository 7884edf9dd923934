//! Statevector synthesis engine
//!
//! This crate ties the gate algebra of `synq-gates` and the register of
//! `synq-state` into a single [`SynthesisEngine`] with:
//!
//! - **Gate application** by name, with case-insensitive aliases
//! - **Schrödinger evolution** by one-time eigendecomposition of H
//! - **Measurement** by Born-rule sampling, with optional collapse
//! - **Persistence** of states and results under a fixed storage allocation
//! - **Relativistic annotation** of results (Lorentz factors)
//!
//! # Example
//!
//! ```no_run
//! use synq_sim::{hamiltonians, EngineConfig, SynthesisEngine};
//! use synq_state::InitialState;
//!
//! let config = EngineConfig::default()
//!     .with_storage_root("/tmp/synq")
//!     .with_seed(7);
//! let mut engine = SynthesisEngine::new(config)?;
//!
//! engine.initialize(1, &InitialState::Zero)?;
//! let result = engine.evolve(&hamiltonians::pauli_x(1.0), std::f64::consts::PI, 500, false)?;
//! println!("final energy {:.6}", result.final_energy());
//!
//! engine.save_state("flipped")?;
//! # Ok::<(), synq_sim::SimError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod hamiltonians;
pub mod lorentz;
pub mod persistence;
pub mod result;

pub use config::{EngineConfig, HardwareConfig};
pub use engine::{BellPair, EngineStatus, SynthesisEngine};
pub use error::{ErrorCategory, Result, SimError};
pub use evolution::SchrodingerSolver;
pub use lorentz::{relativistic_energy_momentum, EnergyMomentum, LorentzBoost};
pub use persistence::{StateArchive, StorageManager, StorageUsage};
pub use result::{
    GateLogEntry, MeasurementOutcome, NumericWarning, SimulationMode, SimulationResult, StateInfo,
    TopState,
};
