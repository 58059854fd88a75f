//! Destination resolution
//!
//! Turns each newly-unique [`FileRecord`] into a [`ResolvedFile`] whose
//! destination is
//!
//! ```text
//! <destination root>/<category>/<extension or no-extension dir>/[<incremental subfolder>/]<name>
//! ```
//!
//! Resolution is sequential. Every folder keeps the set of names handed out
//! during this run; a name already taken there (or already present on disk)
//! gets a random lowercase alphanumeric suffix on its base name, retried until
//! the result is free.

use crate::classify::categories::CategoryMap;
use crate::classify::sniff::{resolve_extension, split_file_name};
use crate::duplicate::ContentHash;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Characters used for collision suffixes
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Suffix attempts at one length before the suffix is lengthened
const ATTEMPTS_PER_LENGTH: usize = 16;

/// A newly-unique source file that has no destination yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path in the source tree
    pub source: PathBuf,
    /// Content digest
    pub hash: ContentHash,
    /// Size in bytes as read while hashing
    pub size: u64,
}

impl FileRecord {
    pub fn new(source: PathBuf, hash: ContentHash, size: u64) -> Self {
        Self { source, hash, size }
    }

    /// Attach the destination, consuming the record
    pub fn resolve(self, destination: PathBuf) -> ResolvedFile {
        ResolvedFile {
            source: self.source,
            destination,
            hash: self.hash,
            size: self.size,
        }
    }
}

/// A record with its destination fixed, ready to be moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub hash: ContentHash,
    pub size: u64,
}

/// Layout settings for the destination tree
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Root of the destination tree
    pub destination_root: PathBuf,
    /// Folder used in place of an extension when none was found
    pub no_extension_dir: String,
    /// Extra subfolder for incremental runs, `None` for a from-scratch run
    pub incremental_subfolder: Option<String>,
    /// Length of the random collision suffix
    pub suffix_length: usize,
}

impl ResolverSettings {
    pub fn new<P: Into<PathBuf>>(destination_root: P) -> Self {
        Self {
            destination_root: destination_root.into(),
            no_extension_dir: "no_extension".to_string(),
            incremental_subfolder: None,
            suffix_length: 10,
        }
    }
}

/// Sequential destination resolver holding the per-folder name sets
pub struct DestinationResolver<'a> {
    categories: &'a CategoryMap,
    settings: ResolverSettings,
    assigned: HashMap<PathBuf, HashSet<OsString>>,
    rng: StdRng,
}

impl<'a> DestinationResolver<'a> {
    pub fn new(categories: &'a CategoryMap, settings: ResolverSettings) -> Self {
        Self::with_rng(categories, settings, StdRng::from_entropy())
    }

    /// Resolver with a fixed suffix sequence
    pub fn with_seed(categories: &'a CategoryMap, settings: ResolverSettings, seed: u64) -> Self {
        Self::with_rng(categories, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(categories: &'a CategoryMap, settings: ResolverSettings, rng: StdRng) -> Self {
        Self {
            categories,
            settings,
            assigned: HashMap::new(),
            rng,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve every record in order
    pub fn resolve_all(&mut self, records: Vec<FileRecord>) -> Vec<ResolvedFile> {
        let resolved: Vec<ResolvedFile> = records.into_iter().map(|r| self.resolve(r)).collect();
        debug!(
            "Resolved {} destinations across {} folders",
            resolved.len(),
            self.assigned.len()
        );
        resolved
    }

    /// Fix the destination for one record
    pub fn resolve(&mut self, record: FileRecord) -> ResolvedFile {
        let file_name = record.source.file_name().unwrap_or_default();

        let (base, name_ext) = split_file_name(file_name);
        let extension = match name_ext {
            Some(ext) => ext,
            None => resolve_extension(&record.source, file_name),
        };

        let category = self.categories.resolve_category(&extension).to_string();
        let folder = self.destination_folder(&category, &extension);
        let final_name = self.claim_name(&folder, base, &extension);

        let destination = folder.join(&final_name);
        trace!(
            "{} -> {}",
            record.source.display(),
            destination.display()
        );
        record.resolve(destination)
    }

    /// Folder for files of `category` with `extension`
    pub fn destination_folder(&self, category: &str, extension: &str) -> PathBuf {
        let ext_dir = if extension.is_empty() {
            self.settings.no_extension_dir.as_str()
        } else {
            extension
        };

        let mut folder = self.settings.destination_root.join(category).join(ext_dir);
        if let Some(sub) = &self.settings.incremental_subfolder {
            folder.push(sub);
        }
        folder
    }

    /// Number of names handed out in `folder` so far
    pub fn assigned_in(&self, folder: &Path) -> usize {
        self.assigned.get(folder).map_or(0, HashSet::len)
    }

    fn claim_name(&mut self, folder: &Path, base: &OsStr, extension: &str) -> OsString {
        let mut name = compose_name(base, "", extension);
        let mut suffix_len = self.settings.suffix_length.max(1);
        let mut attempts = 0;

        while self.is_taken(folder, &name) {
            if attempts == ATTEMPTS_PER_LENGTH {
                suffix_len += 1;
                attempts = 0;
            }
            attempts += 1;

            let suffix = self.random_suffix(suffix_len);
            name = compose_name(base, &suffix, extension);
        }

        if attempts > 0 {
            debug!(
                "Name collision in {}; using {}",
                folder.display(),
                name.to_string_lossy()
            );
        }

        self.assigned
            .entry(folder.to_path_buf())
            .or_default()
            .insert(name_key(&name));
        name
    }

    /// Taken by this run (compared case-insensitively) or present on disk
    fn is_taken(&self, folder: &Path, name: &OsStr) -> bool {
        let in_run = self
            .assigned
            .get(folder)
            .is_some_and(|names| names.contains(&name_key(name)));

        in_run || folder.join(name).exists()
    }

    fn random_suffix(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| SUFFIX_CHARSET[self.rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
            .collect()
    }
}

/// `base[_suffix][.extension]`, keeping the bytes of `base` as they are
fn compose_name(base: &OsStr, suffix: &str, extension: &str) -> OsString {
    let mut name = base.to_os_string();
    if !suffix.is_empty() {
        name.push("_");
        name.push(suffix);
    }
    if !extension.is_empty() {
        name.push(".");
        name.push(extension);
    }
    name
}

/// Case-insensitive key for UTF-8 names; other names compare by their bytes
fn name_key(name: &OsStr) -> OsString {
    match name.to_str() {
        Some(s) => s.to_lowercase().into(),
        None => name.to_os_string(),
    }
}
