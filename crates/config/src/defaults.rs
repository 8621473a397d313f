//! Default values for every persisted field.

/// Executable name watched for focus when nothing is configured.
pub(crate) const TARGET_EXE: &str = "game.exe";

// Scan codes (keyboard set 1). Numpad-slash toggles the pin, numpad-star
// releases it into cam mode; space is the translated key; Q and E cancel.
pub(crate) const ACTIVATE_SC: u32 = 53;
pub(crate) const DEACTIVATE_SC: u32 = 55;
pub(crate) const TRANSLATE_SC: u32 = 57;
pub(crate) const CANCEL_A_SC: u32 = 16;
pub(crate) const CANCEL_B_SC: u32 = 18;

// Bottom-right corner of a 1080p primary display, and its center.
pub(crate) const FROZEN_POINT: (i32, i32) = (1919, 1079);
pub(crate) const UNFROZEN_POINT: (i32, i32) = (960, 540);

pub(crate) const FOCUS_POLL_MS: u64 = 500;
pub(crate) const POSITION_POLL_MS: u64 = 10;
