//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use synq_state::{BackendPreference, StorageOptions, MAX_QUBITS};

/// Fixed hardware budget, set once when the engine is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Largest register accepted by `initialize` (at most 18)
    ///
    /// Default: 18
    pub max_qubits: usize,

    /// Ceiling for in-memory amplitude vectors
    ///
    /// Default: 5.6 GB
    pub max_memory_bytes: usize,

    /// Total storage allocation under `storage_root`
    ///
    /// Default: 20 GB
    pub max_storage_bytes: u64,

    /// Vectors larger than this are memory-mapped into `storage_root/cache`
    ///
    /// Default: 100 MB
    pub mmap_threshold_bytes: usize,

    /// Upper bound on `n_steps` for a single evolution
    ///
    /// Default: 100 000
    pub max_time_steps: usize,

    /// Advisory wall-clock limit for callers that wrap engine calls.
    /// The engine itself never cancels.
    ///
    /// Default: 300 s
    pub computation_timeout: Duration,

    /// Advisory CPU budget, reported in status
    ///
    /// Default: 4
    pub cpu_cores: usize,

    /// Directory holding `states/`, `results/`, `cache/`
    pub storage_root: PathBuf,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            max_qubits: MAX_QUBITS,
            max_memory_bytes: 5_600_000_000,
            max_storage_bytes: 20_000_000_000,
            mmap_threshold_bytes: 100_000_000,
            max_time_steps: 100_000,
            computation_timeout: Duration::from_secs(300),
            cpu_cores: 4,
            storage_root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".synq")
        .join("synthesis_data")
}

impl HardwareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the qubit ceiling (clamped to 18)
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits.min(MAX_QUBITS);
        self
    }

    pub fn with_max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    pub fn with_max_storage_bytes(mut self, bytes: u64) -> Self {
        self.max_storage_bytes = bytes;
        self
    }

    pub fn with_mmap_threshold_bytes(mut self, bytes: usize) -> Self {
        self.mmap_threshold_bytes = bytes;
        self
    }

    pub fn with_max_time_steps(mut self, steps: usize) -> Self {
        self.max_time_steps = steps;
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Storage policy for amplitude vectors
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            mmap_threshold_bytes: self.mmap_threshold_bytes,
            max_memory_bytes: self.max_memory_bytes,
            scratch_dir: self.storage_root.join("cache"),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_qubits == 0 || self.max_qubits > MAX_QUBITS {
            return Err(format!(
                "max_qubits must be in 1..={}, got {}",
                MAX_QUBITS, self.max_qubits
            ));
        }
        if self.max_memory_bytes == 0 {
            return Err("max_memory_bytes must be > 0".to_string());
        }
        if self.max_storage_bytes == 0 {
            return Err("max_storage_bytes must be > 0".to_string());
        }
        if self.max_time_steps == 0 {
            return Err("max_time_steps must be > 0".to_string());
        }
        if self.storage_root.as_os_str().is_empty() {
            return Err("storage_root must not be empty".to_string());
        }
        Ok(())
    }
}

/// Engine policy on top of the hardware budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub hardware: HardwareConfig,

    /// Seed for the measurement sampler; `None` draws from OS entropy
    ///
    /// Default: None
    pub seed: Option<u64>,

    /// Gate log entries kept, oldest evicted first
    ///
    /// Default: 100
    pub gate_log_capacity: usize,

    /// Evolution results kept, oldest evicted first
    ///
    /// Default: 50
    pub history_capacity: usize,

    /// Which gate backend the probe may select
    ///
    /// Default: Auto
    pub backend: BackendPreference,

    /// gzip level for saved archives (0-9)
    ///
    /// Default: 6
    pub compression_level: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hardware: HardwareConfig::default(),
            seed: None,
            gate_log_capacity: 100,
            history_capacity: 50,
            backend: BackendPreference::Auto,
            compression_level: 6,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic configuration rooted at `storage_root`: fixed seed,
    /// reference kernels.
    pub fn deterministic(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            hardware: HardwareConfig::default().with_storage_root(storage_root),
            seed: Some(42),
            backend: BackendPreference::Reference,
            ..Default::default()
        }
    }

    pub fn with_hardware(mut self, hardware: HardwareConfig) -> Self {
        self.hardware = hardware;
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.hardware.storage_root = root.into();
        self
    }

    /// Set the random seed for reproducible measurement
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_gate_log_capacity(mut self, capacity: usize) -> Self {
        self.gate_log_capacity = capacity;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.hardware.validate()?;
        if self.gate_log_capacity == 0 {
            return Err("gate_log_capacity must be > 0".to_string());
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be > 0".to_string());
        }
        if self.compression_level > 9 {
            return Err(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            ));
        }
        Ok(())
    }
}
