//! Amplitude storage: contiguous memory or a memory-mapped file
//!
//! Both variants dereference to `[Complex64]`, so kernels and callers index
//! them identically. The variant is fixed when the storage is allocated.

use crate::error::{Result, StateError};
use memmap2::{MmapMut, MmapOptions};
use num_complex::Complex64;
use std::fs::OpenOptions;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes per amplitude (two f64)
pub const BYTES_PER_AMPLITUDE: usize = std::mem::size_of::<Complex64>();

/// Default size above which amplitudes go to a memory-mapped file (100 MB)
pub const DEFAULT_MMAP_THRESHOLD_BYTES: usize = 100_000_000;

static MAPPED_FILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Allocation policy handed down from the engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOptions {
    /// Vectors strictly larger than this are memory-mapped
    pub mmap_threshold_bytes: usize,
    /// Ceiling for in-memory vectors
    pub max_memory_bytes: usize,
    /// Directory that receives memory-mapped backing files
    pub scratch_dir: PathBuf,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD_BYTES,
            max_memory_bytes: 5_600_000_000,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl StorageOptions {
    /// Whether a vector of `dimension` amplitudes would be memory-mapped
    pub fn uses_mmap(&self, dimension: usize) -> bool {
        dimension.saturating_mul(BYTES_PER_AMPLITUDE) > self.mmap_threshold_bytes
    }
}

/// Backing store for a state vector
#[derive(Debug)]
pub enum AmplitudeStorage {
    InMemory(Vec<Complex64>),
    MemoryMapped(MappedAmplitudes),
}

impl AmplitudeStorage {
    /// Allocate `dimension` zeroed amplitudes, choosing the variant by size.
    ///
    /// # Errors
    ///
    /// [`StateError::AllocationError`] if an in-memory vector would exceed
    /// `max_memory_bytes`, [`StateError::MappedStorage`] if the backing file
    /// cannot be created or mapped.
    pub fn allocate(dimension: usize, options: &StorageOptions) -> Result<Self> {
        let size = dimension.saturating_mul(BYTES_PER_AMPLITUDE);
        if options.uses_mmap(dimension) {
            let seq = MAPPED_FILE_SEQ.fetch_add(1, Ordering::Relaxed);
            let num_qubits = dimension.trailing_zeros();
            let path = options.scratch_dir.join(format!(
                "state_{}_{}_{}q.dat",
                std::process::id(),
                seq,
                num_qubits
            ));
            return MappedAmplitudes::create(path, dimension).map(AmplitudeStorage::MemoryMapped);
        }

        if size > options.max_memory_bytes {
            return Err(StateError::AllocationError {
                size,
                limit: options.max_memory_bytes,
            });
        }
        Ok(AmplitudeStorage::InMemory(vec![Complex64::new(0.0, 0.0); dimension]))
    }

    /// Whether this storage is file-backed
    pub fn is_mapped(&self) -> bool {
        matches!(self, AmplitudeStorage::MemoryMapped(_))
    }

    /// Path of the backing file, if mapped and not yet released
    pub fn backing_path(&self) -> Option<&Path> {
        match self {
            AmplitudeStorage::InMemory(_) => None,
            AmplitudeStorage::MemoryMapped(mapped) => mapped.path(),
        }
    }

    /// Release any file backing. Safe to call more than once.
    pub fn release(&mut self) {
        match self {
            AmplitudeStorage::InMemory(values) => {
                values.clear();
                values.shrink_to_fit();
            }
            AmplitudeStorage::MemoryMapped(mapped) => mapped.release(),
        }
    }
}

impl Deref for AmplitudeStorage {
    type Target = [Complex64];

    fn deref(&self) -> &[Complex64] {
        match self {
            AmplitudeStorage::InMemory(values) => values,
            AmplitudeStorage::MemoryMapped(mapped) => mapped.as_slice(),
        }
    }
}

impl DerefMut for AmplitudeStorage {
    fn deref_mut(&mut self) -> &mut [Complex64] {
        match self {
            AmplitudeStorage::InMemory(values) => values,
            AmplitudeStorage::MemoryMapped(mapped) => mapped.as_mut_slice(),
        }
    }
}

/// Amplitudes living in a sized, memory-mapped scratch file.
///
/// The mapping is dropped before the file is removed.
#[derive(Debug)]
pub struct MappedAmplitudes {
    mmap: Option<MmapMut>,
    path: PathBuf,
    len: usize,
}

impl MappedAmplitudes {
    fn create(path: PathBuf, len: usize) -> Result<Self> {
        let map_err = |e: std::io::Error| StateError::MappedStorage {
            path: path.clone(),
            message: e.to_string(),
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(map_err)?;
        // set_len zero-fills, which is the all-zero amplitude vector
        file.set_len((len * BYTES_PER_AMPLITUDE) as u64)
            .map_err(map_err)?;

        // SAFETY: the file was created above with create_new and is private to
        // this process; nothing else truncates it while the map is alive.
        let mmap = unsafe { MmapOptions::new().len(len * BYTES_PER_AMPLITUDE).map_mut(&file) }
            .map_err(map_err)?;

        tracing::debug!(path = %path.display(), amplitudes = len, "mapped state vector");
        Ok(Self {
            mmap: Some(mmap),
            path,
            len,
        })
    }

    fn path(&self) -> Option<&Path> {
        self.mmap.as_ref().map(|_| self.path.as_path())
    }

    fn as_slice(&self) -> &[Complex64] {
        match &self.mmap {
            // SAFETY: the map is page aligned, holds exactly `len` Complex64
            // values (repr(C) pair of f64), and lives as long as `self`.
            Some(mmap) => unsafe {
                std::slice::from_raw_parts(mmap.as_ptr() as *const Complex64, self.len)
            },
            None => &[],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [Complex64] {
        match &mut self.mmap {
            // SAFETY: as in `as_slice`; the unique borrow of `self` makes the
            // returned slice the only live reference into the map.
            Some(mmap) => unsafe {
                std::slice::from_raw_parts_mut(mmap.as_mut_ptr() as *mut Complex64, self.len)
            },
            None => &mut [],
        }
    }

    fn release(&mut self) {
        if let Some(mmap) = self.mmap.take() {
            drop(mmap);
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove state backing file");
            }
            self.len = 0;
        }
    }
}

impl Drop for MappedAmplitudes {
    fn drop(&mut self) {
        self.release();
    }
}
