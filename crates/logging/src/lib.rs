#![warn(missing_docs)]

//! Shared logging helpers and CLI argument definitions for the mousepin
//! workspace.
//!
//! Binaries flatten [`LogArgs`] into their clap definition, compute the final
//! filter spec with [`compute_spec`], and install a subscriber with the
//! resulting [`EnvFilter`].

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "mousepin_engine=trace,keyedge=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        "mousepin",
        "mousepin_engine",
        "config",
        "keyedge",
        "focus_watcher",
        "win_hotkey",
        "win_pointer",
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    let parts: Vec<String> = our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect();
    parts.join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    if let Ok(spec) = env::var("RUST_LOG") {
        spec
    } else {
        level_spec_for("info")
    }
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let spec = compute_spec(true, false, Some("warn"), Some("keyedge=trace"));
        assert_eq!(spec, "keyedge=trace");
    }

    #[test]
    fn level_flag_scopes_our_crates() {
        let spec = compute_spec(false, true, None, None);
        assert!(spec.contains("mousepin_engine=debug"));
        assert!(spec.contains("win_hotkey=debug"));
    }
}
