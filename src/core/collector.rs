//! Run orchestration
//!
//! [`UniqueFileCollector::run`] drives one collection run through its phases:
//!
//! ```text
//! Init → ConfigLoaded → RegistryLoaded → Hashed → Resolved → Moved → Persisted → Done
//!   ╰──────────┴──────────────┴──────────→ Aborted
//! ```
//!
//! Failing to load the category map or a supplied prior registry aborts the run
//! before anything on disk changes. Per-file hash and move failures are
//! collected in the [`RunSummary`]. A registry that cannot be written is
//! reported in the summary without undoing the moves.

use crate::classify::categories::{CategoryMap, CategoryProvider};
use crate::core::config::CollectorConfig;
use crate::core::error::{CollectorError, FileFailure, Result};
use crate::core::mover::move_all;
use crate::core::registry::HashRegistry;
use crate::core::resolver::{DestinationResolver, FileRecord, ResolverSettings};
use crate::core::scan::{scan_source, validate_directory, ScanOptions};
use crate::core::summary::RunSummary;
use crate::duplicate::{hash_files, HashOptions, HashProgress};
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Phase of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ConfigLoaded,
    RegistryLoaded,
    Hashed,
    Resolved,
    Moved,
    Persisted,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::ConfigLoaded => "config loaded",
            RunState::RegistryLoaded => "registry loaded",
            RunState::Hashed => "hashed",
            RunState::Resolved => "resolved",
            RunState::Moved => "moved",
            RunState::Persisted => "persisted",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// Progress notifications emitted while a run executes
#[derive(Debug, Clone)]
pub enum CollectorEvent {
    /// The run entered a new phase
    StateChanged(RunState),
    /// The source walk finished
    ScanComplete { files: usize },
    /// One file finished hashing
    Hashing(HashProgress),
    /// The move phase is starting
    MoveStarted { total: usize },
    /// One move attempt finished
    FileMoved {
        source: PathBuf,
        destination: PathBuf,
        size: u64,
        moved: bool,
    },
}

/// Everything a run needs besides the category map
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Root of the tree to collect from
    pub source: PathBuf,
    /// Root of the categorized destination tree
    pub destination: PathBuf,
    /// Registry written by an earlier run; makes this run incremental
    pub prior_hashes: Option<PathBuf>,
    /// Where to write the registry (default: `<destination>/<registry_file_name>`)
    pub registry_out: Option<PathBuf>,
    pub registry_file_name: String,
    pub incremental_subfolder: String,
    pub separate_incremental_runs: bool,
    pub no_extension_dir: String,
    pub default_category: String,
    pub suffix_length: usize,
    pub follow_symlinks: bool,
    pub hash: HashOptions,
    /// Resolve only; move nothing and persist nothing
    pub dry_run: bool,
}

impl CollectorOptions {
    /// Options with default collector settings
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>>(source: S, destination: D) -> Self {
        Self::from_config(&CollectorConfig::default(), source, destination)
    }

    /// Options taking their settings from the `[collector]` config section
    pub fn from_config<S: Into<PathBuf>, D: Into<PathBuf>>(
        config: &CollectorConfig,
        source: S,
        destination: D,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            prior_hashes: None,
            registry_out: None,
            registry_file_name: config.registry_file_name.clone(),
            incremental_subfolder: config.incremental_subfolder.clone(),
            separate_incremental_runs: config.separate_incremental_runs,
            no_extension_dir: config.no_extension_dir.clone(),
            default_category: config.default_category.clone(),
            suffix_length: config.suffix_length,
            follow_symlinks: config.follow_symlinks,
            hash: HashOptions::with_workers(config.max_workers),
            dry_run: false,
        }
    }

    pub fn with_prior_hashes<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.prior_hashes = Some(path.into());
        self
    }

    pub fn with_registry_out<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.registry_out = Some(path.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Path the registry is persisted to
    pub fn registry_path(&self) -> PathBuf {
        self.registry_out
            .clone()
            .unwrap_or_else(|| self.destination.join(&self.registry_file_name))
    }

    /// Whether this run started from a prior registry
    pub fn is_incremental(&self) -> bool {
        self.prior_hashes.is_some()
    }

    fn resolver_settings(&self) -> ResolverSettings {
        let incremental_subfolder = if self.is_incremental() && self.separate_incremental_runs {
            Some(self.incremental_subfolder.clone())
        } else {
            None
        };

        ResolverSettings {
            destination_root: self.destination.clone(),
            no_extension_dir: self.no_extension_dir.clone(),
            incremental_subfolder,
            suffix_length: self.suffix_length,
        }
    }

    fn scan_options(&self) -> ScanOptions {
        let mut scan = ScanOptions {
            follow_symlinks: self.follow_symlinks,
            ..ScanOptions::default()
        }
        .exclude(&self.destination)
        .exclude(self.registry_path());

        if let Some(prior) = &self.prior_hashes {
            scan = scan.exclude(prior);
        }
        scan
    }
}

/// Orchestrates one collection run
pub struct UniqueFileCollector {
    options: CollectorOptions,
    state: RunState,
}

impl UniqueFileCollector {
    pub fn new(options: CollectorOptions) -> Self {
        Self {
            options,
            state: RunState::Init,
        }
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    /// Phase the last run reached
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute a full run
    ///
    /// Returns `Err` only for fatal problems (invalid paths, category or
    /// registry load failure, cancellation), all of which happen before any
    /// file is moved.
    pub fn run<F>(
        &mut self,
        categories: &dyn CategoryProvider,
        shutdown_flag: &AtomicBool,
        on_event: F,
    ) -> Result<RunSummary>
    where
        F: Fn(CollectorEvent) + Send + Sync,
    {
        self.state = RunState::Init;
        let result = self.run_phases(categories, shutdown_flag, &on_event);

        if let Err(ref e) = result {
            warn!("Run aborted in state '{}': {}", self.state, e);
            self.transition(RunState::Aborted, &on_event);
        }
        result
    }

    fn run_phases<F>(
        &mut self,
        categories: &dyn CategoryProvider,
        shutdown_flag: &AtomicBool,
        on_event: &F,
    ) -> Result<RunSummary>
    where
        F: Fn(CollectorEvent) + Send + Sync,
    {
        let start = Instant::now();
        self.check_paths()?;

        let category_map = CategoryMap::load(categories)?
            .with_default_category(self.options.default_category.clone());
        self.transition(RunState::ConfigLoaded, on_event);

        let registry = HashRegistry::load(self.options.prior_hashes.as_deref())?;
        self.transition(RunState::RegistryLoaded, on_event);

        let paths = scan_source(&self.options.source, &self.options.scan_options())?;
        on_event(CollectorEvent::ScanComplete { files: paths.len() });

        let mut summary = RunSummary {
            files_scanned: paths.len(),
            registry_path: self.options.registry_path(),
            incremental: self.options.is_incremental(),
            incremental_subfolder: self.options.resolver_settings().incremental_subfolder,
            dry_run: self.options.dry_run,
            ..RunSummary::default()
        };

        if !summary.incremental && summary.registry_path.exists() {
            warn!(
                "{} already exists and no previous hash file was given; \
                 its hashes will not be carried over (use --previous-hashes to keep them)",
                summary.registry_path.display()
            );
            summary.replaced_registry = !summary.dry_run;
        }

        if shutdown_flag.load(Ordering::SeqCst) {
            return Err(CollectorError::Cancelled);
        }

        let batch = hash_files(&paths, &self.options.hash, shutdown_flag, |progress| {
            on_event(CollectorEvent::Hashing(progress))
        });

        if batch.interrupted {
            info!("Hashing interrupted, discarding this run's registry changes");
            return Err(CollectorError::Cancelled);
        }

        summary
            .failures
            .extend(batch.failures().map(FileFailure::from_error));

        // Discovery order decides which of several identical files is kept.
        let mut records = Vec::new();
        for (path, hashed) in batch.hashed() {
            if registry.contains_and_add(hashed.hash) {
                records.push(FileRecord::new(path.to_path_buf(), hashed.hash, hashed.size));
            } else {
                debug!("Duplicate content, leaving {} in place", path.display());
                summary.duplicates_skipped += 1;
            }
        }

        info!(
            "{} unique files, {} duplicates, {} hash failures",
            records.len(),
            summary.duplicates_skipped,
            summary.failures.len()
        );
        self.transition(RunState::Hashed, on_event);

        if shutdown_flag.load(Ordering::SeqCst) {
            info!("Shutdown requested before resolution, nothing was moved");
            return Err(CollectorError::Cancelled);
        }

        let mut resolver =
            DestinationResolver::new(&category_map, self.options.resolver_settings());
        let planned = resolver.resolve_all(records);
        self.transition(RunState::Resolved, on_event);

        summary.registry_size = registry.len();

        if self.options.dry_run {
            info!("Dry run: {} files would be moved", planned.len());
            summary.planned = planned;
            summary.elapsed = start.elapsed();
            self.transition(RunState::Done, on_event);
            return Ok(summary);
        }

        on_event(CollectorEvent::MoveStarted {
            total: planned.len(),
        });
        let report = move_all(planned.clone(), |file, moved| {
            on_event(CollectorEvent::FileMoved {
                source: file.source.clone(),
                destination: file.destination.clone(),
                size: file.size,
                moved,
            })
        });
        summary.planned = planned;
        summary.files_moved = report.moved.len();
        summary.bytes_moved = report.bytes_moved;
        summary.failures.extend(report.failures);
        self.transition(RunState::Moved, on_event);

        match registry.persist(&summary.registry_path) {
            Ok(()) => self.transition(RunState::Persisted, on_event),
            Err(e) => {
                warn!("{}; moved files stay in place", e);
                summary.persist_error = Some(e.to_string());
            }
        }

        summary.elapsed = start.elapsed();
        self.transition(RunState::Done, on_event);
        Ok(summary)
    }

    fn check_paths(&self) -> Result<()> {
        let source = validate_directory(&self.options.source, "source")?;
        let destination = &self.options.destination;

        if destination.exists() {
            let destination = validate_directory(destination, "destination")?;
            if destination == source {
                return Err(CollectorError::InvalidPath {
                    path: destination,
                    message: "destination must differ from the source".to_string(),
                });
            }
        }

        if let Some(prior) = &self.options.prior_hashes {
            debug!("Incremental run against {}", prior.display());
        }
        Ok(())
    }

    fn transition<F>(&mut self, next: RunState, on_event: &F)
    where
        F: Fn(CollectorEvent),
    {
        debug!("Run state: {} -> {}", self.state, next);
        self.state = next;
        on_event(CollectorEvent::StateChanged(next));
    }
}

/// Run a collection with no progress reporting
pub fn collect(
    options: CollectorOptions,
    categories: &dyn CategoryProvider,
    shutdown_flag: &AtomicBool,
) -> Result<RunSummary> {
    UniqueFileCollector::new(options).run(categories, shutdown_flag, |_| {})
}

/// Whether `path` lies inside `root` once both are resolved
pub fn is_within(path: &Path, root: &Path) -> bool {
    let path = crate::core::scan::normalize_path(path);
    let root = crate::core::scan::normalize_path(root);
    path.starts_with(root)
}
