//! On-disk storage: saved states, saved results, scratch cache
//!
//! Layout under the storage root:
//!
//! ```text
//! storage_info.json        allocation marker
//! states/<name>.qstate     gzip(bincode(StateArchive))
//! results/<name>.json.gz   gzip(json(SimulationResult))
//! cache/                   memory-mapped amplitude files
//! ```
//!
//! Every write is encoded in memory first, checked against the fixed
//! allocation, then written to a temporary file and renamed into place.

use crate::error::{Result, SimError};
use crate::result::{GateLogEntry, SimulationResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use synq_state::state::check_qubit_count;
use synq_state::{QuantumState, MAX_QUBITS};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Current archive layout version
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

/// Saved-state file extension
pub const STATE_EXTENSION: &str = "qstate";

/// Largest norm deviation accepted when loading
pub const ARCHIVE_NORM_TOLERANCE: f64 = 1e-6;

const MARKER_FILE: &str = "storage_info.json";
const STATES_DIR: &str = "states";
const RESULTS_DIR: &str = "results";
const CACHE_DIR: &str = "cache";

/// Contents of `storage_info.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageMarker {
    pub allocated_bytes: u64,
    /// Unix seconds
    pub created: u64,
    pub engine_version: String,
    pub purpose: String,
}

/// Snapshot of storage consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub path: PathBuf,
    pub allocated_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub used_percent: f64,
    pub file_count: usize,
}

/// Serialized form of a saved state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateArchive {
    pub format_version: u32,
    pub n_qubits: usize,
    /// (re, im) pairs, MSB-first basis order
    pub amplitudes: Vec<(f64, f64)>,
    pub gate_log: Vec<GateLogEntry>,
}

impl StateArchive {
    pub fn from_state(state: &QuantumState, gate_log: Vec<GateLogEntry>) -> Self {
        Self {
            format_version: ARCHIVE_FORMAT_VERSION,
            n_qubits: state.num_qubits(),
            amplitudes: state.amplitudes().iter().map(|a| (a.re, a.im)).collect(),
            gate_log,
        }
    }

    pub fn amplitudes(&self) -> Vec<Complex64> {
        self.amplitudes
            .iter()
            .map(|&(re, im)| Complex64::new(re, im))
            .collect()
    }

    /// Check everything a load depends on; `path` is used for the error only.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let corrupt = |reason: String| SimError::CorruptArchive {
            path: path.to_path_buf(),
            reason,
        };

        if self.format_version != ARCHIVE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }
        check_qubit_count(self.n_qubits, MAX_QUBITS)
            .map_err(|e| corrupt(e.to_string()))?;
        let expected = 1usize << self.n_qubits;
        if self.amplitudes.len() != expected {
            return Err(corrupt(format!(
                "expected {} amplitudes, found {}",
                expected,
                self.amplitudes.len()
            )));
        }
        if self
            .amplitudes
            .iter()
            .any(|(re, im)| !re.is_finite() || !im.is_finite())
        {
            return Err(corrupt("non-finite amplitude".to_string()));
        }
        let norm = self
            .amplitudes
            .iter()
            .map(|(re, im)| re * re + im * im)
            .sum::<f64>()
            .sqrt();
        if (norm - 1.0).abs() > ARCHIVE_NORM_TOLERANCE {
            return Err(corrupt(format!("state norm {norm} is not 1")));
        }
        Ok(())
    }
}

/// Reject empty names and anything that could escape the storage root
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(SimError::InvalidArgument(format!(
            "invalid storage name '{name}': must be non-empty without path separators or '..'"
        )));
    }
    Ok(())
}

/// Owner of the storage root and its fixed allocation
#[derive(Debug, Clone)]
pub struct StorageManager {
    root: PathBuf,
    allocated_bytes: u64,
    compression_level: u32,
}

impl StorageManager {
    /// Create the directory layout and allocation marker, reusing an
    /// existing marker.
    pub fn open(root: impl Into<PathBuf>, allocated_bytes: u64, compression_level: u32) -> Result<Self> {
        let root = root.into();
        for dir in [STATES_DIR, RESULTS_DIR, CACHE_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }

        let manager = Self {
            root,
            allocated_bytes,
            compression_level: compression_level.min(9),
        };
        manager.ensure_marker()?;
        Ok(manager)
    }

    fn ensure_marker(&self) -> Result<()> {
        let path = self.root.join(MARKER_FILE);
        if path.exists() {
            match serde_json::from_slice::<StorageMarker>(&fs::read(&path)?) {
                Ok(marker) => {
                    info!(
                        allocated_gb = marker.allocated_bytes as f64 / 1e9,
                        path = %self.root.display(),
                        "using existing storage allocation"
                    );
                    return Ok(());
                }
                Err(err) => warn!(%err, "unreadable storage marker, rewriting"),
            }
        }

        let marker = StorageMarker {
            allocated_bytes: self.allocated_bytes,
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            purpose: "quantum_simulation_data".to_string(),
        };
        fs::write(&path, serde_json::to_vec_pretty(&marker)?)?;
        info!(
            allocated_gb = self.allocated_bytes as f64 / 1e9,
            path = %self.root.display(),
            "created storage allocation"
        );
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for memory-mapped amplitude files
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    pub fn state_path(&self, name: &str) -> PathBuf {
        self.root
            .join(STATES_DIR)
            .join(format!("{name}.{STATE_EXTENSION}"))
    }

    pub fn result_path(&self, name: &str) -> PathBuf {
        self.root.join(RESULTS_DIR).join(format!("{name}.json.gz"))
    }

    /// Walk the storage root and total every regular file
    pub fn usage(&self) -> Result<StorageUsage> {
        let mut used_bytes = 0;
        let mut file_count = 0;
        walk(&self.root, &mut used_bytes, &mut file_count)?;

        Ok(StorageUsage {
            path: self.root.clone(),
            allocated_bytes: self.allocated_bytes,
            used_bytes,
            available_bytes: self.allocated_bytes.saturating_sub(used_bytes),
            used_percent: 100.0 * used_bytes as f64 / self.allocated_bytes.max(1) as f64,
            file_count,
        })
    }

    /// Fail with [`SimError::StorageExceeded`] unless `required` more bytes fit
    pub fn check_budget(&self, required: u64) -> Result<()> {
        let available = self.usage()?.available_bytes;
        if required > available {
            return Err(SimError::StorageExceeded {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Write an archive to `states/<name>.qstate`
    pub fn save_state(&self, name: &str, archive: &StateArchive) -> Result<PathBuf> {
        validate_name(name)?;
        let encoded = bincode::serialize(archive)?;
        let bytes = self.compress(&encoded)?;
        let path = self.state_path(name);
        self.write_within_budget(&path, &bytes)?;
        info!(
            path = %path.display(),
            n_qubits = archive.n_qubits,
            bytes = bytes.len(),
            "state saved"
        );
        Ok(path)
    }

    /// Read and fully validate `states/<name>.qstate`
    pub fn load_state(&self, name: &str) -> Result<StateArchive> {
        validate_name(name)?;
        let path = self.state_path(name);
        if !path.is_file() {
            return Err(SimError::StateNotFound {
                name: name.to_string(),
            });
        }

        let compressed = fs::read(&path)?;
        let mut encoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut encoded)
            .map_err(|e| SimError::CorruptArchive {
                path: path.clone(),
                reason: format!("gzip: {e}"),
            })?;
        let archive: StateArchive =
            bincode::deserialize(&encoded).map_err(|e| SimError::CorruptArchive {
                path: path.clone(),
                reason: format!("decode: {e}"),
            })?;
        archive.validate(&path)?;

        debug!(path = %path.display(), n_qubits = archive.n_qubits, "archive validated");
        Ok(archive)
    }

    /// Write a result to `results/<name>.json.gz`
    pub fn save_result(&self, name: &str, result: &SimulationResult) -> Result<PathBuf> {
        validate_name(name)?;
        let json = serde_json::to_vec(result)?;
        let bytes = self.compress(&json)?;
        let path = self.result_path(name);
        self.write_within_budget(&path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "result saved");
        Ok(path)
    }

    /// Names of saved states, sorted
    pub fn list_states(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.root.join(STATES_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(STATE_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.compression_level));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn write_within_budget(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        // an overwritten file frees its old size
        let replaced = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        self.check_budget((bytes.len() as u64).saturating_sub(replaced))?;

        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| SimError::Io(e.error))?;
        Ok(())
    }
}

fn walk(dir: &Path, bytes: &mut u64, files: &mut usize) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&entry.path(), bytes, files)?;
        } else if file_type.is_file() {
            *bytes += entry.metadata()?.len();
            *files += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use synq_state::{InitialState, StorageOptions};
    use tempfile::TempDir;

    fn manager(dir: &TempDir, allocated: u64) -> StorageManager {
        StorageManager::open(dir.path(), allocated, 6).unwrap()
    }

    fn archive(n: usize) -> StateArchive {
        let state = QuantumState::new(n, &InitialState::Plus, &StorageOptions::default()).unwrap();
        let log = vec![GateLogEntry {
            gate: "H".to_string(),
            targets: vec![0],
            controls: vec![],
            params: vec![],
        }];
        StateArchive::from_state(&state, log)
    }

    #[test]
    fn test_layout_and_marker() {
        let dir = TempDir::new().unwrap();
        let storage = manager(&dir, 1_000_000);
        for sub in ["states", "results", "cache"] {
            assert!(dir.path().join(sub).is_dir());
        }
        let marker: StorageMarker =
            serde_json::from_slice(&fs::read(dir.path().join(MARKER_FILE)).unwrap()).unwrap();
        assert_eq!(marker.allocated_bytes, 1_000_000);
        assert_eq!(storage.cache_dir(), dir.path().join("cache"));

        // reopening keeps the existing marker
        let reopened = manager(&dir, 42);
        let marker: StorageMarker =
            serde_json::from_slice(&fs::read(dir.path().join(MARKER_FILE)).unwrap()).unwrap();
        assert_eq!(marker.allocated_bytes, 1_000_000);
        assert_eq!(reopened.usage().unwrap().allocated_bytes, 42);
    }

    #[test]
    fn test_usage_counts_files() {
        let dir = TempDir::new().unwrap();
        let storage = manager(&dir, 1_000_000);
        let before = storage.usage().unwrap();
        assert_eq!(before.file_count, 1);

        fs::write(dir.path().join("results").join("blob"), vec![0u8; 1000]).unwrap();
        let after = storage.usage().unwrap();
        assert_eq!(after.file_count, 2);
        assert_eq!(after.used_bytes, before.used_bytes + 1000);
        assert_eq!(after.available_bytes, 1_000_000 - after.used_bytes);
        assert!(after.used_percent > 0.0);
    }

    #[test]
    fn test_state_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = manager(&dir, 10_000_000);
        let original = archive(4);

        let path = storage.save_state("plus4", &original).unwrap();
        assert_eq!(path, dir.path().join("states").join("plus4.qstate"));
        assert_eq!(storage.load_state("plus4").unwrap(), original);
        assert_eq!(storage.list_states().unwrap(), vec!["plus4".to_string()]);
    }

    #[test]
    fn test_missing_state() {
        let dir = TempDir::new().unwrap();
        let storage = manager(&dir, 1_000_000);
        assert!(matches!(
            storage.load_state("nothing"),
            Err(SimError::StateNotFound { .. })
        ));
    }

    #[test]
    fn test_budget_exceeded() {
        let dir = TempDir::new().unwrap();
        let storage = manager(&dir, 100);
        let err = storage.save_state("big", &archive(8)).unwrap_err();
        assert!(matches!(err, SimError::StorageExceeded { .. }));
        assert!(!storage.state_path("big").exists());
    }

    #[test]
    fn test_corrupt_archive_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = manager(&dir, 1_000_000);
        fs::write(storage.state_path("junk"), b"not gzip").unwrap();
        assert!(matches!(
            storage.load_state("junk"),
            Err(SimError::CorruptArchive { .. })
        ));

        let mut bad = archive(2);
        bad.amplitudes[0] = (5.0, 0.0);
        storage.save_state("unnormalized", &bad).unwrap();
        assert!(matches!(
            storage.load_state("unnormalized"),
            Err(SimError::CorruptArchive { .. })
        ));

        let mut short = archive(2);
        short.amplitudes.pop();
        assert!(short.validate(Path::new("x")).is_err());
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("bell").is_ok());
        for bad in ["", "  ", "../escape", "a/b", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad:?} accepted");
        }
    }
}
