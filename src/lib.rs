//! Unique File Collector Library
//!
//! Scans a source tree, finds every file whose content has not been seen
//! before (in this run or in a previous run's hash registry), and moves those
//! files into a destination tree organized as `category/extension/`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, errors, the hash registry, destination
//!   resolution, moving, and the run orchestrator
//! - [`duplicate`] - Content hashing with SHA256 on a bounded worker pool
//! - [`classify`] - Extension → category mapping and content sniffing
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use unique_file_collector::classify::InlineCategoryProvider;
//! use unique_file_collector::core::collector::{CollectorOptions, UniqueFileCollector};
//! use std::sync::atomic::AtomicBool;
//!
//! fn main() -> anyhow::Result<()> {
//!     let options = CollectorOptions::new("/data/inbox", "/data/sorted")
//!         .with_prior_hashes("/data/sorted/unique_hashes.txt");
//!
//!     let shutdown_flag = AtomicBool::new(false);
//!     let mut collector = UniqueFileCollector::new(options);
//!     let summary = collector.run(&InlineCategoryProvider::builtin(), &shutdown_flag, |_| {})?;
//!
//!     println!(
//!         "moved {} files, skipped {} duplicates",
//!         summary.files_moved, summary.duplicates_skipped
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Whole-file dedup** - SHA256 content identity, first file in discovery order wins
//! - **Incremental runs** - Reload the previous registry so known files are skipped
//!   even after being renamed or moved
//! - **Collision-free naming** - Random suffixes for same-named files in one folder
//! - **Safe persistence** - Registry written to a temp file and atomically renamed

pub mod classify;
pub mod cli;
pub mod core;
pub mod duplicate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
