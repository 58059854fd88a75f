//! File relocation
//!
//! Moves resolved files into the destination tree. A failed move is recorded
//! and the batch carries on; files already moved stay moved.

use crate::core::error::{CollectorError, FileFailure, Result};
use crate::core::resolver::ResolvedFile;
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Outcome of the move phase
#[derive(Debug, Default)]
pub struct MoveReport {
    /// Files now at their destination
    pub moved: Vec<ResolvedFile>,
    /// Files that stayed in the source tree
    pub failures: Vec<FileFailure>,
    /// Total size of the moved files
    pub bytes_moved: u64,
}

/// Move every file, in order
///
/// `on_file` is called after each attempt with the file and whether it moved.
pub fn move_all<F>(files: Vec<ResolvedFile>, mut on_file: F) -> MoveReport
where
    F: FnMut(&ResolvedFile, bool),
{
    let mut report = MoveReport::default();

    for file in files {
        match move_file(&file.source, &file.destination) {
            Ok(()) => {
                on_file(&file, true);
                report.bytes_moved += file.size;
                report.moved.push(file);
            }
            Err(e) => {
                warn!("{}", e);
                on_file(&file, false);
                report.failures.push(FileFailure::from_error(&e));
            }
        }
    }

    info!(
        "Moved {} files ({} bytes), {} failed",
        report.moved.len(),
        report.bytes_moved,
        report.failures.len()
    );

    report
}

/// Move one file, creating the destination folder if needed
///
/// Tries a rename first and falls back to copy + remove (e.g. across
/// filesystems). An existing destination is never overwritten. If the source
/// cannot be removed after copying, the copy is deleted again so the file
/// exists only in the source.
pub fn move_file(source: &Path, destination: &Path) -> Result<()> {
    let move_error = |message: String| CollectorError::Move {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        message,
    };

    if destination.symlink_metadata().is_ok() {
        return Err(move_error("destination already exists".to_string()));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| move_error(format!("failed to create directory: {}", e)))?;
    }

    match fs::rename(source, destination) {
        Ok(()) => {
            debug!("Moved {} -> {}", source.display(), destination.display());
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(move_error(format!("source disappeared: {}", e)));
        }
        Err(e) => {
            debug!(
                "Rename of {} failed ({}), copying instead",
                source.display(),
                e
            );
        }
    }

    copy_new(source, destination).map_err(|e| {
        if e.kind() != io::ErrorKind::AlreadyExists {
            let _ = fs::remove_file(destination);
        }
        move_error(format!("copy failed: {}", e))
    })?;

    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(move_error(format!(
            "copied but could not remove source, copy discarded: {}",
            e
        )));
    }

    debug!("Copied {} -> {}", source.display(), destination.display());
    Ok(())
}

/// Copy into a file that must not exist yet
fn copy_new(source: &Path, destination: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;

    if let Ok(metadata) = reader.metadata() {
        let _ = fs::set_permissions(destination, metadata.permissions());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FailureStage;
    use crate::duplicate::compute_data_hash;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn resolved(source: PathBuf, destination: PathBuf, content: &[u8]) -> ResolvedFile {
        ResolvedFile {
            source,
            destination,
            hash: compute_data_hash(content),
            size: content.len() as u64,
        }
    }

    #[test]
    fn test_move_file_creates_folders() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, "hello").unwrap();
        let destination = temp_dir.path().join("dest").join("documents").join("txt").join("a.txt");

        move_file(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "hello");
    }

    #[test]
    fn test_move_file_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("b.txt");
        fs::write(&source, "new").unwrap();
        fs::write(&destination, "old").unwrap();

        let result = move_file(&source, &destination);

        assert!(matches!(result, Err(CollectorError::Move { .. })));
        assert_eq!(fs::read_to_string(&source).unwrap(), "new");
        assert_eq!(fs::read_to_string(&destination).unwrap(), "old");
    }

    #[test]
    fn test_move_all_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("one.txt"), "1").unwrap();
        fs::write(root.join("three.txt"), "333").unwrap();

        let files = vec![
            resolved(root.join("one.txt"), root.join("out").join("one.txt"), b"1"),
            resolved(root.join("gone.txt"), root.join("out").join("gone.txt"), b"22"),
            resolved(root.join("three.txt"), root.join("out").join("three.txt"), b"333"),
        ];

        let mut seen = Vec::new();
        let report = move_all(files, |file, ok| seen.push((file.source.clone(), ok)));

        assert_eq!(report.moved.len(), 2);
        assert_eq!(report.bytes_moved, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, root.join("gone.txt"));
        assert_eq!(report.failures[0].stage, FailureStage::Move);
        assert_eq!(seen.len(), 3);
        assert!(!seen[1].1);
        assert!(root.join("out").join("three.txt").exists());
    }

    #[test]
    fn test_copy_new_refuses_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.bin");
        let destination = temp_dir.path().join("dst.bin");
        fs::write(&source, [1u8, 2, 3]).unwrap();
        fs::write(&destination, [9u8]).unwrap();

        assert!(copy_new(&source, &destination).is_err());
        assert_eq!(fs::read(&destination).unwrap(), vec![9u8]);
    }

    #[test]
    fn test_copy_new_copies_content() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.bin");
        let destination = temp_dir.path().join("dst.bin");
        fs::write(&source, [1u8, 2, 3]).unwrap();

        copy_new(&source, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), vec![1u8, 2, 3]);
        assert!(source.exists());
    }
}
