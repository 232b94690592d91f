//! Tagged diagnostic output for the engine.
//!
//! Two macros, both writing a color-tagged line to stderr:
//! - `log!` always prints
//! - `debug!` prints only when verbose mode is on
//!
//! Traversal summaries and collapse counts go through `debug!`, so an
//! embedding bundler stays silent unless its user asked for detail:
//!
//! ```ignore
//! debug!("traverse"; "delta: {} added, {} deleted", added, deleted);
//! ```

use owo_colors::OwoColorize;
use std::{
    io::{Write, stderr},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag, wired to the embedding tool's --verbose switch.
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Write a line to stderr tagged with the originating subsystem.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, but dropped entirely unless verbose mode is on.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::log!($module; $($arg)*);
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn log(module: &str, message: &str) {
    let mut out = stderr().lock();
    writeln!(out, "{} {message}", colorize_tag(module)).ok();
}

/// Color a subsystem tag. The engine has two hot tags of its own:
/// `traverse` (expansion and deltas) and `graph` (store maintenance,
/// collapse sweeps). Error reports stand out in red; anything else, such
/// as a tag supplied by an embedding tool, is dimmed rather than given a
/// color of its own.
fn colorize_tag(module: &str) -> String {
    let tag = format!("[{module}]");
    if module.eq_ignore_ascii_case("error") {
        return tag.bright_red().bold().to_string();
    }
    match module {
        "traverse" => tag.bright_cyan().bold().to_string(),
        "graph" => tag.bright_magenta().bold().to_string(),
        _ => tag.dimmed().to_string(),
    }
}
