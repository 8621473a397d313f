//! Pointer-side OS operations.
//!
//! Everything the cursor pinner and the orchestrator need from the OS on
//! the mouse side, behind the [`PointerOps`] trait: reading and forcing the
//! cursor position, swallowing all pointer input system-wide, and injecting
//! simulated mouse-button transitions.
//!
//! `RealPointerOps` talks to Win32 and only exists on Windows;
//! [`MockPointerOps`] records every call for tests and builds anywhere.
//! Injected button events are tagged (see `eventtag`) so the keyboard hook
//! and the suppression hook ignore our own output.

mod error;
mod ops;
#[cfg(target_os = "windows")]
mod sys;

pub use error::{Error, Result};
pub use ops::{MockPointerOps, PointerOps};
#[cfg(target_os = "windows")]
pub use ops::RealPointerOps;

/// A physical mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// The primary button.
    Left,
    /// The secondary button.
    Right,
    /// The wheel button.
    Middle,
}
