//! Concurrent content hashing
//!
//! Computes a SHA256 digest for every discovered source file on a bounded
//! rayon pool. Files are streamed in fixed 8 KiB chunks so peak memory stays
//! flat no matter how large a file is.
//!
//! The per-file worker ([`hash_file_worker`]) is a pure unit of work: it takes a
//! path and returns a hash or a failure, and touches no shared state. Registry
//! membership is decided by the caller afterwards, in discovery order, which
//! keeps "first file wins" deterministic across runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use unique_file_collector::duplicate::hasher::{hash_files, HashOptions};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! let paths = vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")];
//! let shutdown = Arc::new(AtomicBool::new(false));
//! let batch = hash_files(&paths, &HashOptions::default(), &shutdown, |p| {
//!     println!("Progress: {}/{}", p.current, p.total);
//! });
//! println!("{} hashed, {} failed", batch.hashed().count(), batch.failures().count());
//! ```

use crate::core::error::{CollectorError, Result};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Chunk size for streaming hash computation (8 KiB)
pub const HASH_CHUNK_SIZE: usize = 8 * 1024;

/// Upper bound on the automatic worker count
const MAX_AUTO_WORKERS: usize = 32;

/// Length of a hex-encoded SHA256 digest
pub const CONTENT_HASH_HEX_LEN: usize = 64;

/// SHA256 digest of a file's full byte content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal form, always 64 characters
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Error returned when a string is not a 64-character lowercase hex digest
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseHashError(String);

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(hex: &str) -> std::result::Result<Self, Self::Err> {
        if hex.len() != CONTENT_HASH_HEX_LEN {
            return Err(ParseHashError(format!(
                "expected {} hex characters, got {}",
                CONTENT_HASH_HEX_LEN,
                hex.len()
            )));
        }

        let mut hash = [0u8; 32];
        for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => hash[i] = (hi << 4) | lo,
                _ => {
                    return Err(ParseHashError(format!(
                        "invalid hex digits '{}' (lowercase 0-9a-f only)",
                        String::from_utf8_lossy(pair)
                    )))
                }
            }
        }

        Ok(Self(hash))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Progress information for the hashing phase
#[derive(Debug, Clone)]
pub struct HashProgress {
    /// Number of files finished so far (hashed or failed)
    pub current: usize,
    /// Total files to process
    pub total: usize,
    /// File that just finished
    pub current_file: PathBuf,
    /// Number of failures so far
    pub errors: usize,
}

/// Options for the hashing phase
#[derive(Debug, Clone, Default)]
pub struct HashOptions {
    /// Number of worker threads (0 = automatic)
    pub max_workers: usize,
}

impl HashOptions {
    /// Create options with an explicit worker count (0 = automatic)
    pub fn with_workers(max_workers: usize) -> Self {
        Self { max_workers }
    }

    /// Worker count actually used for the pool
    pub fn effective_workers(&self) -> usize {
        if self.max_workers > 0 {
            self.max_workers
        } else {
            default_worker_count()
        }
    }
}

/// Default pool size: min(32, available cores + 4)
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    MAX_AUTO_WORKERS.min(cores + 4)
}

/// Result of hashing a single file
#[derive(Debug)]
pub struct HashOutcome {
    /// The file that was hashed
    pub path: PathBuf,
    /// Digest on success, per-file error otherwise
    pub result: Result<HashedFile>,
}

/// A successfully hashed file
#[derive(Debug, Clone, Copy)]
pub struct HashedFile {
    /// Content digest
    pub hash: ContentHash,
    /// Bytes read while hashing
    pub size: u64,
}

/// All outcomes of one hashing pass, in the same order as the input paths
#[derive(Debug, Default)]
pub struct HashBatch {
    /// One entry per input path that was processed
    pub outcomes: Vec<HashOutcome>,
    /// Whether the pass stopped early because of a shutdown request
    pub interrupted: bool,
}

impl HashBatch {
    /// Iterate over successfully hashed files
    pub fn hashed(&self) -> impl Iterator<Item = (&Path, &HashedFile)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|h| (o.path.as_path(), h)))
    }

    /// Iterate over per-file failures
    pub fn failures(&self) -> impl Iterator<Item = &CollectorError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }
}

/// Hash every path on a bounded worker pool
///
/// Per-file I/O failures never abort the batch; they come back as `Err`
/// outcomes. When `shutdown_flag` is raised, files not yet started are left
/// out of the batch and `interrupted` is set.
///
/// # Arguments
/// * `paths` - Files to hash, in discovery order
/// * `options` - Worker pool sizing
/// * `shutdown_flag` - Flag to signal early termination
/// * `progress_callback` - Called after every finished file
pub fn hash_files<F>(
    paths: &[PathBuf],
    options: &HashOptions,
    shutdown_flag: &AtomicBool,
    progress_callback: F,
) -> HashBatch
where
    F: Fn(HashProgress) + Send + Sync,
{
    let total = paths.len();
    if total == 0 {
        return HashBatch::default();
    }

    let workers = options.effective_workers();
    info!("Hashing {} files with {} workers", total, workers);

    let processed = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);

    let run = || -> Vec<Option<HashOutcome>> {
        paths
            .par_iter()
            .map(|path| {
                if shutdown_flag.load(Ordering::Relaxed) {
                    return None;
                }

                let result = hash_file_worker(path);
                if let Err(ref e) = result {
                    warn!("Skipping file: {}", e);
                    errors.fetch_add(1, Ordering::Relaxed);
                }

                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                progress_callback(HashProgress {
                    current,
                    total,
                    current_file: path.clone(),
                    errors: errors.load(Ordering::Relaxed),
                });

                Some(HashOutcome {
                    path: path.clone(),
                    result,
                })
            })
            .collect()
    };

    let collected = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(run),
        Err(e) => {
            warn!("Failed to build hashing pool, using global pool: {}", e);
            run()
        }
    };

    let interrupted = shutdown_flag.load(Ordering::SeqCst);
    let outcomes: Vec<HashOutcome> = collected.into_iter().flatten().collect();

    debug!(
        "Hashing finished: {} processed, {} errors{}",
        outcomes.len(),
        errors.load(Ordering::Relaxed),
        if interrupted { " (interrupted)" } else { "" }
    );

    HashBatch {
        outcomes,
        interrupted,
    }
}

/// Hash one file; the pure unit of work run on the pool
pub fn hash_file_worker(path: &Path) -> Result<HashedFile> {
    trace!("Hashing {}", path.display());
    compute_file_hash(path).map_err(|e| CollectorError::HashCompute {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Compute the SHA256 of a file by streaming it in 8 KiB chunks
pub fn compute_file_hash(path: &Path) -> std::io::Result<HashedFile> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());

    Ok(HashedFile {
        hash: ContentHash(hash),
        size,
    })
}

/// Compute the SHA256 of in-memory data
pub fn compute_data_hash(data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(data);

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    ContentHash(hash)
}
