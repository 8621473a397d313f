//! focus-watcher: observe which process owns the foreground window.
//!
//! A [`FocusWatcher`] polls the OS on a fixed interval, resolves the
//! foreground window to its owning executable name, and compares it
//! case-insensitively against the configured target. Gain and loss callbacks
//! fire exactly once per genuine transition, never once per poll.
//!
//! Query failures (no foreground window, the process exited mid-query, the
//! process is inaccessible) are treated as "not focused" and never stop the
//! loop. Reconfiguration swaps the compared name without resetting the
//! reported state, so focus is simply re-evaluated on the next poll.

mod ops;
#[cfg(target_os = "windows")]
mod sys;
mod watcher;

pub use ops::{ForegroundOps, MockForegroundOps};
#[cfg(target_os = "windows")]
pub use ops::RealForegroundOps;
pub use watcher::{FocusCallback, FocusWatcher};
