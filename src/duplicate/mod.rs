//! Duplicate detection module
//!
//! Content-addressed identity for files: every file is reduced to the SHA256
//! of its bytes, and two files with the same digest are the same file for the
//! purposes of collection.
//!
//! # Submodules
//!
//! - `hasher` - Content hash type and the concurrent hashing pass

pub mod hasher;

pub use hasher::{
    compute_data_hash, compute_file_hash, hash_files, ContentHash, HashBatch, HashOptions,
    HashOutcome, HashProgress, HashedFile,
};
