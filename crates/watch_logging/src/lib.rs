#![deny(missing_docs)]
//! Shared logging utilities for the watch workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase,
//! a per-thread run label that prefixes every line, and a minimal test
//! initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Thread-local label of the watched configuration currently running.
    static RUN_LABEL: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Sets the run label for the current thread.
/// Called once at the start of a run so every log line names the watch.
pub fn set_run_label(label: impl Into<String>) {
    let label = label.into();
    RUN_LABEL.with(|v| *v.borrow_mut() = label);
}

/// Retrieves the run label for the current thread.
/// Returns `-` if no label has been set.
pub fn run_label() -> String {
    RUN_LABEL.with(|v| {
        let label = v.borrow();
        if label.is_empty() {
            "-".to_string()
        } else {
            label.clone()
        }
    })
}

/// Logs a trace-level message tagged with the current run label.
#[macro_export]
macro_rules! watch_trace {
    ($($arg:tt)*) => {{
        log::trace!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current run label.
#[macro_export]
macro_rules! watch_info {
    ($($arg:tt)*) => {{
        log::info!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current run label.
#[macro_export]
macro_rules! watch_debug {
    ($($arg:tt)*) => {{
        log::debug!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current run label.
#[macro_export]
macro_rules! watch_warn {
    ($($arg:tt)*) => {{
        log::warn!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current run label.
#[macro_export]
macro_rules! watch_error {
    ($($arg:tt)*) => {{
        log::error!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test binary thread may have won the race.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
