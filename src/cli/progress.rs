//! Progress bar utilities for CLI output
//!
//! This module renders the collector's progress events as indicatif bars and
//! provides the console helpers shared by all commands.
//!
//! Key features:
//! - One bar for hashing, one for moving
//! - Bars are suspended around log output
//! - Consistent visual styling across all operations

use crate::core::collector::{CollectorEvent, RunState};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the progress bar style for hashing and moving
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} {prefix:<8} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap()
        .progress_chars("━━╾─")
}

/// Get the style for completed progress bars
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ {prefix:<8} [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap()
        .progress_chars("━━━")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a section divider
pub fn print_divider() {
    println!();
    println!("{}", "─".repeat(60));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Collection progress
// ============================================================================

/// Renders [`CollectorEvent`]s as a hashing bar followed by a moving bar
pub struct CollectionProgress {
    hash_bar: Mutex<Option<ProgressBar>>,
    move_bar: Mutex<Option<ProgressBar>>,
    bytes_moved: AtomicU64,
    move_started: Mutex<Option<Instant>>,
}

impl CollectionProgress {
    pub fn new() -> Self {
        Self {
            hash_bar: Mutex::new(None),
            move_bar: Mutex::new(None),
            bytes_moved: AtomicU64::new(0),
            move_started: Mutex::new(None),
        }
    }

    /// Update the display for one event
    pub fn handle(&self, event: CollectorEvent) {
        match event {
            CollectorEvent::ScanComplete { files } => {
                print_info(&format!("Found {} files", files));
                set_bar(&self.hash_bar, new_bar(files as u64, "Hashing"));
            }
            CollectorEvent::Hashing(progress) => {
                with_bar(&self.hash_bar, |bar| {
                    bar.set_position(progress.current as u64);
                    if progress.errors > 0 {
                        bar.set_message(format!("{} unreadable", progress.errors));
                    }
                });
            }
            CollectorEvent::MoveStarted { total } => {
                if let Ok(mut started) = self.move_started.lock() {
                    *started = Some(Instant::now());
                }
                set_bar(&self.move_bar, new_bar(total as u64, "Moving"));
            }
            CollectorEvent::FileMoved {
                source,
                size,
                moved,
                ..
            } => {
                if moved {
                    self.bytes_moved.fetch_add(size, Ordering::Relaxed);
                }
                with_bar(&self.move_bar, |bar| {
                    if !moved {
                        bar.suspend(|| {
                            println!("  ⚠ Could not move {}", source.display());
                        });
                    }
                    bar.inc(1);
                    bar.set_message(self.rate_message());
                });
            }
            CollectorEvent::StateChanged(RunState::Hashed) => {
                finish_bar(&self.hash_bar, "done".to_string());
            }
            CollectorEvent::StateChanged(RunState::Moved) => {
                let bytes = self.bytes_moved.load(Ordering::Relaxed);
                finish_bar(&self.move_bar, format_bytes(bytes));
            }
            CollectorEvent::StateChanged(RunState::Aborted) => {
                self.abandon("aborted");
            }
            CollectorEvent::StateChanged(_) => {}
        }
    }

    /// Stop any bar still running
    pub fn abandon(&self, msg: &str) {
        for slot in [&self.hash_bar, &self.move_bar] {
            if let Some(bar) = slot.lock().ok().and_then(|mut b| b.take()) {
                bar.abandon_with_message(format!("✗ {}", msg));
            }
        }
    }

    /// Total bytes reported as moved so far
    pub fn bytes_moved(&self) -> u64 {
        self.bytes_moved.load(Ordering::Relaxed)
    }

    fn rate_message(&self) -> String {
        let bytes = self.bytes_moved.load(Ordering::Relaxed);
        let elapsed = self
            .move_started
            .lock()
            .ok()
            .and_then(|s| *s)
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        if elapsed > 0.0 {
            format!("{:.1} MB/s", bytes as f64 / elapsed / 1024.0 / 1024.0)
        } else {
            String::new()
        }
    }
}

impl Default for CollectionProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn new_bar(len: u64, prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(progress_bar_style());
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn set_bar(slot: &Mutex<Option<ProgressBar>>, bar: ProgressBar) {
    if let Ok(mut current) = slot.lock() {
        *current = Some(bar);
    }
}

fn with_bar<F: FnOnce(&ProgressBar)>(slot: &Mutex<Option<ProgressBar>>, f: F) {
    if let Ok(current) = slot.lock() {
        if let Some(bar) = current.as_ref() {
            f(bar);
        }
    }
}

fn finish_bar(slot: &Mutex<Option<ProgressBar>>, msg: String) {
    if let Some(bar) = slot.lock().ok().and_then(|mut b| b.take()) {
        bar.set_style(completed_style());
        bar.finish_with_message(msg);
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicate::HashProgress;
    use std::path::PathBuf;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_collection_progress_lifecycle() {
        let progress = CollectionProgress::new();
        progress.handle(CollectorEvent::ScanComplete { files: 2 });
        progress.handle(CollectorEvent::Hashing(HashProgress {
            current: 1,
            total: 2,
            current_file: PathBuf::from("a.txt"),
            errors: 0,
        }));
        progress.handle(CollectorEvent::StateChanged(RunState::Hashed));
        assert!(progress.hash_bar.lock().unwrap().is_none());

        progress.handle(CollectorEvent::MoveStarted { total: 1 });
        progress.handle(CollectorEvent::FileMoved {
            source: PathBuf::from("a.txt"),
            destination: PathBuf::from("/dest/a.txt"),
            size: 5,
            moved: false,
        });
        progress.handle(CollectorEvent::StateChanged(RunState::Moved));
        assert!(progress.move_bar.lock().unwrap().is_none());
        assert_eq!(progress.bytes_moved(), 0);
    }
}
