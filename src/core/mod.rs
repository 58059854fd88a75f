//! Core functionality module
//!
//! This module contains the core business logic for the unique file
//! collector: configuration, error handling, the hash registry, the source
//! walk, destination resolution, moving, and the orchestrator tying them
//! together.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types, per-file failures and exit codes
//! - `registry` - Persisted set of known content hashes
//! - `scan` - Source tree walk
//! - `resolver` - Destination path resolution with collision avoidance
//! - `mover` - Relocation of resolved files
//! - `collector` - Run state machine
//! - `summary` - End-of-run report

pub mod collector;
pub mod config;
pub mod error;
pub mod mover;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod summary;
