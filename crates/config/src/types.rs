//! Core value types shared across the workspace.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Scan code value meaning "no key bound"; a channel bound to this code is
/// disabled rather than registered.
pub const UNBOUND: u32 = 0;

/// A point in virtual-screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate in pixels.
    pub x: i32,
    /// Vertical coordinate in pixels.
    pub y: i32,
}

impl Point {
    /// Create a point from raw coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The five logical hotkeys the engine listens for.
///
/// Roles are a closed set: each maps to exactly one scan-code field in the
/// store, and the engine owns one channel per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyRole {
    /// Toggles the cursor pin while the target is focused.
    Activate,
    /// Releases the pin and enters cam mode.
    Deactivate,
    /// The key reinterpreted as a mouse button while cam mode is active.
    Translate,
    /// First of two keys that force the pin back on and leave cam mode.
    CancelA,
    /// Second cancel key.
    CancelB,
}

impl HotkeyRole {
    /// All roles, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Activate,
        Self::Deactivate,
        Self::Translate,
        Self::CancelA,
        Self::CancelB,
    ];

    /// Stable lowercase name, used for logging and diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Translate => "translate",
            Self::CancelA => "cancel-a",
            Self::CancelB => "cancel-b",
        }
    }
}

impl fmt::Display for HotkeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed mutation of the store.
///
/// Each variant names the field that changed and carries the old and new
/// values; observers receive the event before the triggering setter returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The target executable name changed.
    TargetExe {
        /// Previous name.
        old: String,
        /// New name.
        new: String,
    },
    /// A hotkey binding changed.
    ScanCode {
        /// Which logical hotkey was rebound.
        role: HotkeyRole,
        /// Previous scan code.
        old: u32,
        /// New scan code.
        new: u32,
    },
    /// The pinned cursor position changed.
    FrozenPoint {
        /// Previous position.
        old: Point,
        /// New position.
        new: Point,
    },
    /// The release cursor position changed.
    UnfrozenPoint {
        /// Previous position.
        old: Point,
        /// New position.
        new: Point,
    },
    /// The focus poll interval changed.
    FocusPoll {
        /// Previous interval.
        old: Duration,
        /// New interval.
        new: Duration,
    },
    /// The position re-assert interval changed.
    PositionPoll {
        /// Previous interval.
        old: Duration,
        /// New interval.
        new: Duration,
    },
}

impl Change {
    /// Name of the mutated field, for logging.
    pub fn field(&self) -> &'static str {
        match self {
            Self::TargetExe { .. } => "target_exe",
            Self::ScanCode {
                role: HotkeyRole::Activate,
                ..
            } => "activate_scan_code",
            Self::ScanCode {
                role: HotkeyRole::Deactivate,
                ..
            } => "deactivate_scan_code",
            Self::ScanCode {
                role: HotkeyRole::Translate,
                ..
            } => "translate_scan_code",
            Self::ScanCode {
                role: HotkeyRole::CancelA,
                ..
            } => "cancel_a_scan_code",
            Self::ScanCode {
                role: HotkeyRole::CancelB,
                ..
            } => "cancel_b_scan_code",
            Self::FrozenPoint { .. } => "frozen_point",
            Self::UnfrozenPoint { .. } => "unfrozen_point",
            Self::FocusPoll { .. } => "focus_poll_ms",
            Self::PositionPoll { .. } => "position_poll_ms",
        }
    }
}
