//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Move every file with never-seen-before content out of a directory tree
/// into a destination organized by category and extension
#[derive(Parser, Debug)]
#[command(name = "unique-collector")]
#[command(author = "Vihaan Reddy M")]
#[command(version = "1.0.0")]
#[command(about = "Collect unique files into a category/extension tree, skipping duplicate content", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to collect files from
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Directory to move unique files into
    #[arg(short, long, global = true)]
    pub destination: Option<PathBuf>,

    /// Hash registry written by a previous run (makes this run incremental)
    #[arg(short, long = "previous-hashes", value_name = "FILE", global = true)]
    pub previous_hashes: Option<PathBuf>,

    /// Where to write the hash registry (default: inside the destination)
    #[arg(long, value_name = "FILE", global = true)]
    pub registry_out: Option<PathBuf>,

    /// Category mapping JSON file (overrides config)
    #[arg(long, value_name = "FILE", global = true)]
    pub categories: Option<PathBuf>,

    /// Number of hashing workers, 0 = automatic (overrides config)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Show what would be moved without moving anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Never prompt for missing paths
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect unique files from the source into the destination (default)
    Collect,

    /// Show current configuration
    ShowConfig,

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the path of the active configuration file
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\unique_file_collector\config.toml
    /// - Linux: ~/.config/unique_file_collector/config.toml
    ConfigPath,

    /// Print the extension → category mapping and any conflicting entries
    Categories {
        /// Category JSON file to inspect (defaults to the configured one)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Validate a hash registry file and print how many hashes it holds
    Registry {
        /// Registry file to check
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collect_flags_without_subcommand() {
        let args = Args::try_parse_from([
            "unique-collector",
            "-s",
            "/in",
            "-d",
            "/out",
            "--previous-hashes",
            "/out/unique_hashes.txt",
            "--workers",
            "4",
            "--dry-run",
        ])
        .unwrap();

        assert!(args.command.is_none());
        assert_eq!(args.source, Some(PathBuf::from("/in")));
        assert_eq!(args.destination, Some(PathBuf::from("/out")));
        assert_eq!(
            args.previous_hashes,
            Some(PathBuf::from("/out/unique_hashes.txt"))
        );
        assert_eq!(args.workers, Some(4));
        assert!(args.dry_run);
        assert!(!args.no_prompt);
    }

    #[test]
    fn test_parse_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "unique-collector",
            "collect",
            "--source",
            "/in",
            "--destination",
            "/out",
            "--no-prompt",
        ])
        .unwrap();

        assert!(matches!(args.command, Some(Commands::Collect)));
        assert_eq!(args.source, Some(PathBuf::from("/in")));
        assert!(args.no_prompt);
    }

    #[test]
    fn test_parse_registry_subcommand() {
        let args =
            Args::try_parse_from(["unique-collector", "registry", "/out/unique_hashes.txt"]).unwrap();

        match args.command {
            Some(Commands::Registry { file }) => {
                assert_eq!(file, PathBuf::from("/out/unique_hashes.txt"))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
