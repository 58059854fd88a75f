//! Run summary handed back to the caller when a run finishes

use crate::core::error::{FailureStage, FileFailure};
use crate::core::resolver::ResolvedFile;
use std::path::PathBuf;
use std::time::Duration;

/// What a finished run did
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Files found by the source walk
    pub files_scanned: usize,
    /// Files whose content was already known
    pub duplicates_skipped: usize,
    /// Files relocated into the destination tree
    pub files_moved: usize,
    /// Total size of the relocated files
    pub bytes_moved: u64,
    /// Files skipped because hashing or moving failed
    pub failures: Vec<FileFailure>,
    /// Registry write error, if the final persist failed
    pub persist_error: Option<String>,
    /// Hashes known at the end of the run
    pub registry_size: usize,
    /// Where the registry was (or would have been) written
    pub registry_path: PathBuf,
    /// Resolved moves; in a dry run these were planned but not performed
    pub planned: Vec<ResolvedFile>,
    /// The run was started with a prior hash file
    pub incremental: bool,
    /// Subfolder new files were placed in, when incremental runs are kept apart
    pub incremental_subfolder: Option<String>,
    /// A from-scratch run found an earlier registry at its target and replaced it
    pub replaced_registry: bool,
    /// Nothing was moved or persisted
    pub dry_run: bool,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Per-file failures from one stage
    pub fn failures_in(&self, stage: FailureStage) -> impl Iterator<Item = &FileFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }

    /// Any per-file failure, a persist failure, or a replaced registry
    pub fn has_warnings(&self) -> bool {
        !self.failures.is_empty() || self.persist_error.is_some() || self.replaced_registry
    }

    /// Files that were new this run (moved, planned, or failed to move)
    pub fn unique_files(&self) -> usize {
        self.planned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_and_stage_filter() {
        let mut summary = RunSummary::default();
        assert!(!summary.has_warnings());

        summary.failures.push(FileFailure {
            path: PathBuf::from("/src/a"),
            stage: FailureStage::Hash,
            reason: "permission denied".into(),
        });
        summary.failures.push(FileFailure {
            path: PathBuf::from("/src/b"),
            stage: FailureStage::Move,
            reason: "destination already exists".into(),
        });

        assert!(summary.has_warnings());
        assert_eq!(summary.failures_in(FailureStage::Move).count(), 1);
        assert_eq!(
            summary.failures_in(FailureStage::Hash).next().unwrap().path,
            PathBuf::from("/src/a")
        );
    }

    #[test]
    fn test_persist_error_is_a_warning() {
        let summary = RunSummary {
            persist_error: Some("disk full".into()),
            ..RunSummary::default()
        };
        assert!(summary.has_warnings());
    }

    #[test]
    fn test_replaced_registry_is_a_warning() {
        let summary = RunSummary {
            replaced_registry: true,
            ..RunSummary::default()
        };
        assert!(summary.has_warnings());
    }
}
