//! Unique File Collector - CLI Entry Point
//!
//! Moves every file whose content has not been seen before from a source tree
//! into a destination tree organized by category and extension.
//!
//! This binary is a thin wrapper around the library, handling argument parsing,
//! logging setup, and command dispatch.

use clap::Parser;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use unique_file_collector::cli::{self, Args, DualWriter};
use unique_file_collector::core::config::Config;
use unique_file_collector::core::error::{exit_codes, CollectorError};

fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(ref config_path) = args.config {
        match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                Config::default()
            }
        }
    } else {
        Config::load_default().unwrap_or_else(|e| {
            eprintln!("Warning: {}", e);
            Config::default()
        })
    };

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    // Set up graceful shutdown handler
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    let handler = ctrlc::set_handler(move || {
        if shutdown_flag_clone.load(Ordering::SeqCst) {
            // Second Ctrl+C - force exit
            eprintln!("\nForce shutdown requested. Exiting immediately...");
            std::process::exit(i32::from(exit_codes::CANCELLED));
        } else {
            shutdown_flag_clone.store(true, Ordering::SeqCst);
            eprintln!("\nShutdown requested. Hashing stops after the current files; moves already under way finish. (Press Ctrl+C again to force quit)");
        }
    });
    if let Err(e) = handler {
        eprintln!("Warning: Failed to set Ctrl+C handler: {}", e);
    }

    init_logging(&config);

    info!("Unique File Collector v{}", unique_file_collector::VERSION);

    match cli::run_command(&args, &config, shutdown_flag) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            let code = e
                .downcast_ref::<CollectorError>()
                .map(CollectorError::exit_code)
                .unwrap_or(exit_codes::UNEXPECTED_ERROR);
            error!("{:#}", e);
            ExitCode::from(code)
        }
    }
}

/// Initialize the logger from the `[logging]` settings
fn init_logging(config: &Config) {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    if config.logging.log_to_file {
        // Set up logging to both console and file
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.log_file)
        {
            Ok(log_file) => {
                Builder::new()
                    .filter_level(log_level)
                    .format(|buf, record| {
                        writeln!(
                            buf,
                            "[{} {} {}] {}",
                            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                            record.level(),
                            record.target(),
                            record.args()
                        )
                    })
                    .target(env_logger::Target::Pipe(Box::new(DualWriter {
                        console: std::io::stderr(),
                        file: log_file,
                    })))
                    .init();

                info!("Logging to file: {}", config.logging.log_file.display());
                return;
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to open log file '{}': {}",
                    config.logging.log_file.display(),
                    e
                );
            }
        }
    }

    Builder::from_env(env_logger::Env::default().default_filter_or(log_level.as_str())).init();
}
