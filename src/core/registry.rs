//! Hash registry: the set of content hashes already accounted for
//!
//! The registry is loaded once at the start of a run (from a prior run's file
//! or empty), grows while files are hashed, and is written once at the end.
//! Entries are never removed.
//!
//! # File format
//!
//! Plain UTF-8 text so that any implementation can read it back:
//!
//! ```text
//! # unique-file-collector registry v1 sha256
//! 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
//! 486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7
//! ```
//!
//! Lines starting with `#` and blank lines are ignored; every other line must
//! be a 64-character hex SHA256. Hashes are written sorted.

use crate::core::error::{CollectorError, Result};
use crate::duplicate::ContentHash;
use log::{debug, info};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Header written as the first line of every persisted registry
pub const REGISTRY_HEADER: &str = "# unique-file-collector registry v1 sha256";

/// Thread-safe set of known content hashes
#[derive(Debug, Default)]
pub struct HashRegistry {
    hashes: Mutex<HashSet<ContentHash>>,
}

impl HashRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the given hashes
    pub fn from_hashes<I: IntoIterator<Item = ContentHash>>(hashes: I) -> Self {
        Self {
            hashes: Mutex::new(hashes.into_iter().collect()),
        }
    }

    /// Load a registry from a prior run's file
    ///
    /// `None` yields an empty registry. A path that cannot be read or contains
    /// a malformed line fails with `RegistryLoad`; callers must abort rather
    /// than continue with an empty set.
    pub fn load(source: Option<&Path>) -> Result<Self> {
        let Some(path) = source else {
            debug!("No prior hash file supplied, starting with an empty registry");
            return Ok(Self::new());
        };

        let load_error = |message: String| CollectorError::RegistryLoad {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let reader = BufReader::new(file);
        let mut hashes = HashSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| load_error(e.to_string()))?;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let hash: ContentHash = trimmed
                .parse()
                .map_err(|e| load_error(format!("line {}: {}", index + 1, e)))?;
            hashes.insert(hash);
        }

        info!(
            "Loaded {} known hashes from {}",
            hashes.len(),
            path.display()
        );

        Ok(Self {
            hashes: Mutex::new(hashes),
        })
    }

    /// Insert `hash` if absent
    ///
    /// Returns `true` when the hash was newly added and `false` when it was
    /// already known. Test and insert happen under one lock.
    pub fn contains_and_add(&self, hash: ContentHash) -> bool {
        self.lock().insert(hash)
    }

    /// Check membership without inserting
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.lock().contains(hash)
    }

    /// Number of known hashes
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry holds no hashes
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted copy of the current hashes
    pub fn snapshot(&self) -> Vec<ContentHash> {
        let mut hashes: Vec<ContentHash> = self.lock().iter().copied().collect();
        hashes.sort();
        hashes
    }

    /// Write the full set to `destination`
    ///
    /// The set is written to a sibling temporary file, flushed to disk, then
    /// renamed over the target, so an existing registry is never left
    /// truncated.
    pub fn persist(&self, destination: &Path) -> Result<()> {
        let persist_error = |message: String| CollectorError::Persist {
            path: destination.to_path_buf(),
            message,
        };

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    persist_error(format!("failed to create directory: {}", e))
                })?;
            }
        }

        let temp_path = temp_path_for(destination);
        let hashes = self.snapshot();

        let write_result = (|| -> std::io::Result<()> {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{}", REGISTRY_HEADER)?;
            for hash in &hashes {
                writeln!(writer, "{}", hash)?;
            }
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()
        })();

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(persist_error(format!("failed to write temporary file: {}", e)));
        }

        if let Err(e) = fs::rename(&temp_path, destination) {
            let _ = fs::remove_file(&temp_path);
            return Err(persist_error(format!("failed to replace registry: {}", e)));
        }

        info!(
            "Persisted {} hashes to {}",
            hashes.len(),
            destination.display()
        );
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<ContentHash>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.hashes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Temporary sibling path used while persisting
fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicate::compute_data_hash;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_source_is_empty() {
        let registry = HashRegistry::load(None).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_contains_and_add() {
        let registry = HashRegistry::new();
        let hash = compute_data_hash(b"hello");

        assert!(registry.contains_and_add(hash));
        assert!(!registry.contains_and_add(hash));
        assert!(registry.contains(&hash));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("hashes.txt");

        let registry = HashRegistry::from_hashes(
            [b"a", b"b", b"c"].iter().map(|d| compute_data_hash(*d)),
        );
        registry.persist(&path).unwrap();

        let reloaded = HashRegistry::load(Some(&path)).unwrap();
        assert_eq!(reloaded.snapshot(), registry.snapshot());
        assert!(!temp_path_for(&path).exists());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(REGISTRY_HEADER));
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_persist_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hashes.txt");
        fs::write(&path, "old content that is not a registry").unwrap();

        let registry = HashRegistry::from_hashes([compute_data_hash(b"x")]);
        registry.persist(&path).unwrap();

        let reloaded = HashRegistry::load(Some(&path)).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_load_ignores_comments_and_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hashes.txt");
        let hash = compute_data_hash(b"hello");
        fs::write(&path, format!("# comment\n\n{}\n   \n", hash)).unwrap();

        let registry = HashRegistry::load(Some(&path)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&hash));
    }

    #[test]
    fn test_load_malformed_line_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hashes.txt");
        let hash = compute_data_hash(b"hello");
        fs::write(&path, format!("{}\nnot-a-hash\n", hash)).unwrap();

        match HashRegistry::load(Some(&path)) {
            Err(CollectorError::RegistryLoad { message, .. }) => {
                assert!(message.contains("line 2"));
            }
            other => panic!("expected RegistryLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_signed_or_uppercase_digests() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hashes.txt");
        let hash = compute_data_hash(b"hello");

        for line in ["+f".repeat(32), hash.to_hex().to_uppercase()] {
            fs::write(&path, format!("{}\n{}\n", hash, line)).unwrap();
            match HashRegistry::load(Some(&path)) {
                Err(CollectorError::RegistryLoad { message, .. }) => {
                    assert!(message.contains("line 2"));
                }
                other => panic!("expected RegistryLoad, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("does_not_exist.txt");

        assert!(matches!(
            HashRegistry::load(Some(&path)),
            Err(CollectorError::RegistryLoad { .. })
        ));
    }

    #[test]
    fn test_concurrent_contains_and_add_admits_each_hash_once() {
        let registry = Arc::new(HashRegistry::new());
        let hashes: Vec<ContentHash> = (0..20)
            .map(|i| compute_data_hash(format!("content {}", i).as_bytes()))
            .collect();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let hashes = hashes.clone();
                thread::spawn(move || hashes.iter().filter(|h| registry.contains_and_add(**h)).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, hashes.len());
        assert_eq!(registry.len(), hashes.len());
    }
}
