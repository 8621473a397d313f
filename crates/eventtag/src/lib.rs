//! Shared event tagging helpers used across crates.
//!
//! Injected keyboard and mouse events carry a process-unique marker in the
//! `dwExtraInfo` field so our low-level hooks can ignore them.

/// 'mpin' in ASCII bytes: 0x6d 0x70 0x69 0x6e.
pub const MPIN_TAG: usize = 0x6D70_696E;
