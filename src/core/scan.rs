//! Source tree discovery
//!
//! Walks the source root and returns every regular file in a stable order
//! (entries sorted by file name at each level). That order is the discovery
//! order used for "first file wins" when several files share content.

use crate::core::error::{CollectorError, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options for the source walk
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Files or directory trees to leave out of the walk
    pub excluded: Vec<PathBuf>,
}

impl ScanOptions {
    /// Leave `path` (a file or a whole directory tree) out of the walk
    pub fn exclude<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.excluded.push(normalize_path(path.as_ref()));
        self
    }
}

/// Check that `path` exists and is a directory
///
/// `role` names the path in the error message ("source", "destination").
pub fn validate_directory(path: &Path, role: &str) -> Result<PathBuf> {
    let invalid = |message: String| CollectorError::InvalidPath {
        path: path.to_path_buf(),
        message,
    };

    let metadata = std::fs::metadata(path)
        .map_err(|e| invalid(format!("{} directory is not accessible: {}", role, e)))?;

    if !metadata.is_dir() {
        return Err(invalid(format!("{} is not a directory", role)));
    }

    path.canonicalize()
        .map_err(|e| invalid(format!("failed to resolve {} directory: {}", role, e)))
}

/// Collect all regular files below `source`
///
/// Unreadable entries are logged and skipped. The returned paths are
/// absolute when `source` is.
pub fn scan_source(source: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let source = validate_directory(source, "source")?;
    let excluded = &options.excluded;

    let walker = WalkDir::new(&source)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry.path(), excluded));

    let mut files = Vec::new();
    let mut skipped = 0usize;

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                skipped += 1;
                continue;
            }
        };

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    info!(
        "Found {} files under {}{}",
        files.len(),
        source.display(),
        if skipped > 0 {
            format!(" ({} unreadable entries skipped)", skipped)
        } else {
            String::new()
        }
    );

    Ok(files)
}

fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    if excluded.is_empty() {
        return false;
    }

    let hit = excluded.iter().any(|ex| path == ex.as_path());
    if hit {
        debug!("Excluding {} from the walk", path.display());
    }
    hit
}

/// Absolute, symlink-resolved form of a path that may not exist yet
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// re-attached.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut tail = Vec::new();
    let mut current = absolute.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            return tail.iter().rev().fold(canonical, |acc, name| acc.join(name));
        }
        current = parent;
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
        let root = root.canonicalize().unwrap();
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_scan_returns_files_in_sorted_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("sub").join("c.txt"), "c").unwrap();

        let files = scan_source(root, &ScanOptions::default()).unwrap();
        assert_eq!(names(&files, root), vec!["a.txt", "b.txt", "sub/c.txt"]);
    }

    #[test]
    fn test_scan_skips_excluded_tree_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let dest = root.join("collected");
        fs::create_dir_all(dest.join("documents")).unwrap();
        fs::write(dest.join("documents").join("x.txt"), "x").unwrap();
        fs::write(root.join("hashes.txt"), "").unwrap();
        fs::write(root.join("keep.txt"), "k").unwrap();

        let options = ScanOptions::default()
            .exclude(&dest)
            .exclude(root.join("hashes.txt"));
        let files = scan_source(root, &options).unwrap();

        assert_eq!(names(&files, root), vec!["keep.txt"]);
    }

    #[test]
    fn test_scan_missing_source_is_invalid_path() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_source(&temp_dir.path().join("missing"), &ScanOptions::default());
        assert!(matches!(result, Err(CollectorError::InvalidPath { .. })));
    }

    #[test]
    fn test_validate_directory_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            validate_directory(&file, "source"),
            Err(CollectorError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_normalize_path_for_missing_tail() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let missing = temp_dir.path().join("not").join("there.txt");

        assert_eq!(normalize_path(&missing), root.join("not").join("there.txt"));
    }
}
