//! Mousepin Engine
//!
//! The engine crate coordinates the whole input subsystem:
//! - owns the [`CursorPinner`] and its position re-assert loop
//! - owns the focus watcher and forces unfreeze on focus loss
//! - wires the five hotkey channels into the mode state machine
//! - broadcasts reconfiguration to every dependent component
//!
//! It exposes a minimal API: construct an [`Engine`] with the platform
//! seams (hook, pointer, foreground query) injected, then drive it with
//! [`Engine::run`] until an external stop signal fires. On stop the engine
//! guarantees the cursor is unpinned before returning.

mod engine;
mod pinner;

pub use engine::Engine;
pub use pinner::CursorPinner;
