//! Interactive fallback for paths missing from the command line

use crate::cli::args::Args;
use crate::core::error::{CollectorError, Result};
use dialoguer::{Confirm, Input};
use std::io::IsTerminal;
use std::path::PathBuf;

/// The three paths a collection run consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub previous_hashes: Option<PathBuf>,
}

/// Take the run paths from `args`, asking for any that are missing
///
/// Prompts only when stdin is a terminal and `--no-prompt` was not given;
/// otherwise a missing source or destination is an `InvalidPath` error. The
/// previous hash file is asked for only when the source was also prompted.
pub fn resolve_run_paths(args: &Args) -> Result<RunPaths> {
    let interactive = !args.no_prompt && std::io::stdin().is_terminal();
    let prompted = args.source.is_none() || args.destination.is_none();

    let source = match &args.source {
        Some(path) => path.clone(),
        None if interactive => ask_path("Directory to collect files from")?,
        None => return Err(missing("--source")),
    };

    let destination = match &args.destination {
        Some(path) => path.clone(),
        None if interactive => ask_path("Directory to move unique files into")?,
        None => return Err(missing("--destination")),
    };

    let previous_hashes = match &args.previous_hashes {
        Some(path) => Some(path.clone()),
        None if interactive && prompted => ask_previous_hashes()?,
        None => None,
    };

    Ok(RunPaths {
        source,
        destination,
        previous_hashes,
    })
}

fn ask_path(prompt: &str) -> Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| CollectorError::IoError(format!("Failed to read input: {}", e)))?;

    Ok(PathBuf::from(answer.trim()))
}

fn ask_previous_hashes() -> Result<Option<PathBuf>> {
    let has_previous = Confirm::new()
        .with_prompt("Do you have a hash file from a previous run?")
        .default(false)
        .interact()
        .map_err(|e| CollectorError::IoError(format!("Failed to read input: {}", e)))?;

    if !has_previous {
        return Ok(None);
    }

    ask_path("Path to the previous hash file").map(Some)
}

fn missing(flag: &str) -> CollectorError {
    CollectorError::InvalidPath {
        path: PathBuf::new(),
        message: format!("{} is required when prompting is disabled", flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_paths_from_args_need_no_prompt() {
        let args = Args::try_parse_from([
            "unique-collector",
            "-s",
            "/in",
            "-d",
            "/out",
            "-p",
            "/out/unique_hashes.txt",
        ])
        .unwrap();

        let paths = resolve_run_paths(&args).unwrap();
        assert_eq!(
            paths,
            RunPaths {
                source: PathBuf::from("/in"),
                destination: PathBuf::from("/out"),
                previous_hashes: Some(PathBuf::from("/out/unique_hashes.txt")),
            }
        );
    }

    #[test]
    fn test_missing_path_without_prompt_is_invalid() {
        let args = Args::try_parse_from(["unique-collector", "-s", "/in", "--no-prompt"]).unwrap();

        match resolve_run_paths(&args) {
            Err(CollectorError::InvalidPath { message, .. }) => {
                assert!(message.contains("--destination"))
            }
            other => panic!("expected InvalidPath, got {:?}", other),
        }
    }
}
