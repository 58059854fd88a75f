//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::classify::categories::{CategoryMap, CategoryProvider, FileCategoryProvider};
use crate::cli::args::{Args, Commands};
use crate::cli::progress::{
    format_bytes, format_duration, print_divider, print_error, print_header, print_info,
    print_success, print_warning, CollectionProgress,
};
use crate::cli::prompt::resolve_run_paths;
use crate::core::collector::{is_within, CollectorOptions, UniqueFileCollector};
use crate::core::config::{init_config, Config};
use crate::core::error::FailureStage;
use crate::core::registry::HashRegistry;
use crate::core::summary::RunSummary;
use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Run the command selected on the command line
///
/// With no subcommand the collection runs.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    let config = apply_overrides(args, config);

    match &args.command {
        None | Some(Commands::Collect) => {
            collect_files(args, &config, &shutdown_flag)?;
        }
        Some(Commands::ShowConfig) => {
            show_config(&config);
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ConfigPath) => {
            show_config_path();
        }
        Some(Commands::Categories { file }) => {
            show_categories(&config, file.clone())?;
        }
        Some(Commands::Registry { file }) => {
            check_registry(file)?;
        }
    }

    Ok(())
}

/// Fold command-line overrides into a copy of the config
fn apply_overrides(args: &Args, config: &Config) -> Config {
    let mut config = config.clone();

    if let Some(workers) = args.workers {
        config.collector.max_workers = workers;
    }
    if let Some(categories) = &args.categories {
        config.categories.file = categories.clone();
    }

    config
}

/// Run one collection and print its summary
pub fn collect_files(args: &Args, config: &Config, shutdown_flag: &AtomicBool) -> Result<()> {
    let paths = resolve_run_paths(args)?;

    let mut options =
        CollectorOptions::from_config(&config.collector, &paths.source, &paths.destination)
            .dry_run(args.dry_run);
    if let Some(previous) = &paths.previous_hashes {
        options = options.with_prior_hashes(previous);
    }
    if let Some(registry_out) = &args.registry_out {
        options = options.with_registry_out(registry_out);
    }

    print_header("UNIQUE FILE COLLECTOR");
    print_info(&format!("Source:      {}", paths.source.display()));
    print_info(&format!("Destination: {}", paths.destination.display()));
    match &paths.previous_hashes {
        Some(previous) => print_info(&format!("Previous hashes: {}", previous.display())),
        None => print_info("Previous hashes: none (from-scratch run)"),
    }
    if is_within(&paths.destination, &paths.source) {
        print_info("Destination lies inside the source and is skipped while scanning");
    }
    if args.dry_run {
        print_warning("Dry run: nothing will be moved and no registry will be written");
    }
    println!();

    let provider = config.categories.provider();
    let progress = CollectionProgress::new();
    let mut collector = UniqueFileCollector::new(options);

    let summary = collector.run(provider.as_ref(), shutdown_flag, |event| progress.handle(event))?;

    print_summary(&summary);
    Ok(())
}

/// Print the end-of-run report
pub fn print_summary(summary: &RunSummary) {
    print_divider();
    print_header(if summary.dry_run {
        "DRY RUN SUMMARY"
    } else {
        "COLLECTION SUMMARY"
    });

    print_info(&format!("Files scanned:      {}", summary.files_scanned));
    print_info(&format!("Duplicates skipped: {}", summary.duplicates_skipped));

    if summary.dry_run {
        print_info(&format!("Files to move:      {}", summary.unique_files()));
        for file in &summary.planned {
            println!(
                "      {} → {}",
                file.source.display(),
                file.destination.display()
            );
        }
    } else {
        print_success(&format!(
            "Files moved:        {} ({})",
            summary.files_moved,
            format_bytes(summary.bytes_moved)
        ));
    }

    print_info(&format!(
        "Known hashes:       {} ({})",
        summary.registry_size,
        summary.registry_path.display()
    ));
    if let Some(subfolder) = &summary.incremental_subfolder {
        print_info(&format!(
            "Incremental run: new files were placed in '{}' subfolders",
            subfolder
        ));
    }
    print_info(&format!("Elapsed:            {}", format_duration(summary.elapsed)));

    let hash_failures: Vec<_> = summary.failures_in(FailureStage::Hash).collect();
    let move_failures: Vec<_> = summary.failures_in(FailureStage::Move).collect();

    if !hash_failures.is_empty() {
        println!();
        print_warning(&format!("{} files could not be hashed:", hash_failures.len()));
        for failure in hash_failures {
            println!("      {}: {}", failure.path.display(), failure.reason);
        }
    }

    if !move_failures.is_empty() {
        println!();
        print_warning(&format!(
            "{} files could not be moved and remain in the source:",
            move_failures.len()
        ));
        for failure in move_failures {
            println!("      {}: {}", failure.path.display(), failure.reason);
        }
    }

    if summary.replaced_registry {
        println!();
        print_warning(&format!(
            "{} replaced an earlier registry; pass --previous-hashes to keep its history",
            summary.registry_path.display()
        ));
    }

    if let Some(error) = &summary.persist_error {
        println!();
        print_error(&format!("Hash registry was not saved: {}", error));
        print_warning("Moved files stay moved, but a later run will not recognize them");
    }

    println!();
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    use std::fs;

    let custom_path = output.is_some();
    let output_path = match output {
        Some(path) => path,
        None => init_config()?,
    };

    if custom_path {
        let content = Config::generate_default_config();
        fs::write(&output_path, content)?;
    }

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize the collector settings.");

    Ok(())
}

/// Print the active configuration file path
pub fn show_config_path() {
    let path = Config::get_active_config_path();
    println!("{}", path.display());
    if path.exists() {
        info!("Config file exists at: {}", path.display());
    } else {
        info!("Config file would be created at: {}", path.display());
    }
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[collector]");
    info!(
        "  registry_file_name = \"{}\"",
        config.collector.registry_file_name
    );
    info!(
        "  incremental_subfolder = \"{}\"",
        config.collector.incremental_subfolder
    );
    info!(
        "  separate_incremental_runs = {}",
        config.collector.separate_incremental_runs
    );
    info!(
        "  no_extension_dir = \"{}\"",
        config.collector.no_extension_dir
    );
    info!(
        "  default_category = \"{}\"",
        config.collector.default_category
    );
    info!("  suffix_length = {}", config.collector.suffix_length);
    info!(
        "  max_workers = {}{}",
        config.collector.max_workers,
        if config.collector.max_workers == 0 {
            " (automatic)"
        } else {
            ""
        }
    );
    info!("  follow_symlinks = {}", config.collector.follow_symlinks);
    info!("");
    info!("[categories]");
    if config.categories.file.as_os_str().is_empty() {
        info!("  file = \"\" (built-in categories)");
    } else {
        info!("  file = \"{}\"", config.categories.file.display());
    }
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

/// Print the extension → category mapping
pub fn show_categories(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let provider: Box<dyn CategoryProvider> = match file {
        Some(path) => Box::new(FileCategoryProvider::new(path)),
        None => config.categories.provider(),
    };

    let map = CategoryMap::load(provider.as_ref())?
        .with_default_category(config.collector.default_category.clone());

    print_header("CATEGORIES");
    print_info(&format!("Source: {}", provider.describe()));
    println!();

    for category in map.categories() {
        let extensions = map.extensions_for(category);
        println!("  {:<14} {}", category, extensions.join(", "));
    }
    println!(
        "  {:<14} (any other extension)",
        map.default_category()
    );

    if !map.conflicts().is_empty() {
        println!();
        for conflict in map.conflicts() {
            print_warning(&format!(
                "'{}' is listed under '{}' and '{}'; '{}' is used",
                conflict.extension, conflict.previous, conflict.winner, conflict.winner
            ));
        }
    }

    Ok(())
}

/// Load a registry file and report how many hashes it holds
pub fn check_registry(file: &Path) -> Result<()> {
    let registry = HashRegistry::load(Some(file))?;
    print_success(&format!(
        "{} is a valid registry with {} hashes",
        file.display(),
        registry.len()
    ));
    Ok(())
}
