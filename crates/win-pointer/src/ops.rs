//! The pointer-operations trait with its production and mock implementations.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;

use crate::{MouseButton, Result};

/// Trait abstraction over pointer operations to improve testability.
///
/// All methods may be called from the hook-callback thread and must not
/// block; the real implementations are single Win32 calls plus one
/// thread start/stop for suppression.
pub trait PointerOps: Send + Sync {
    /// Current cursor position in virtual-screen coordinates, if readable.
    fn cursor_pos(&self) -> Option<(i32, i32)>;
    /// Force the cursor to the given position.
    fn set_cursor_pos(&self, x: i32, y: i32) -> Result<()>;
    /// Enable or disable system-wide swallowing of pointer input
    /// (movement, clicks, scrolling). Idempotent.
    fn set_suppressed(&self, active: bool) -> Result<()>;
    /// Inject a simulated button press.
    fn button_down(&self, button: MouseButton) -> Result<()>;
    /// Inject a simulated button release.
    fn button_up(&self, button: MouseButton) -> Result<()>;
}

/// Production implementation backed by Win32.
///
/// Suppression runs a dedicated `WH_MOUSE_LL` hook thread that swallows
/// every non-injected pointer event while active; enabling starts the
/// thread and disabling tears it down, so the hook never outlives its use.
#[cfg(target_os = "windows")]
pub struct RealPointerOps {
    suppression: Mutex<Option<crate::sys::SuppressionHook>>,
}

#[cfg(target_os = "windows")]
impl RealPointerOps {
    /// Create the production pointer ops.
    pub fn new() -> Self {
        Self {
            suppression: Mutex::new(None),
        }
    }
}

#[cfg(target_os = "windows")]
impl Default for RealPointerOps {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "windows")]
impl PointerOps for RealPointerOps {
    fn cursor_pos(&self) -> Option<(i32, i32)> {
        crate::sys::cursor_pos()
    }

    fn set_cursor_pos(&self, x: i32, y: i32) -> Result<()> {
        crate::sys::set_cursor_pos(x, y)
    }

    fn set_suppressed(&self, active: bool) -> Result<()> {
        let mut guard = self.suppression.lock();
        match (active, guard.is_some()) {
            (true, false) => {
                *guard = Some(crate::sys::SuppressionHook::start()?);
            }
            (false, true) => {
                if let Some(hook) = guard.take() {
                    hook.stop();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<()> {
        crate::sys::send_button(button, true)
    }

    fn button_up(&self, button: MouseButton) -> Result<()> {
        crate::sys::send_button(button, false)
    }
}

/// Simple mock implementation for tests.
///
/// Records every cursor move, suppression transition, and button event, and
/// can be told to fail suppression installs to exercise degrade paths.
#[derive(Clone, Default)]
pub struct MockPointerOps {
    pos: Arc<Mutex<(i32, i32)>>,
    moves: Arc<Mutex<Vec<(i32, i32)>>>,
    suppressed: Arc<AtomicBool>,
    suppression_calls: Arc<Mutex<Vec<bool>>>,
    buttons: Arc<Mutex<Vec<(MouseButton, bool)>>>,
    fail_suppression: Arc<AtomicBool>,
}

impl MockPointerOps {
    /// Create an empty mock with the cursor at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every position handed to `set_cursor_pos`, in order.
    pub fn moves(&self) -> Vec<(i32, i32)> {
        self.moves.lock().clone()
    }

    /// Every suppression transition that actually changed state.
    pub fn suppression_calls(&self) -> Vec<bool> {
        self.suppression_calls.lock().clone()
    }

    /// Whether pointer input is currently being swallowed.
    pub fn suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Every simulated button event as `(button, is_down)`, in order.
    pub fn button_events(&self) -> Vec<(MouseButton, bool)> {
        self.buttons.lock().clone()
    }

    /// Count of simulated transitions for one button in one direction.
    pub fn button_count(&self, button: MouseButton, down: bool) -> usize {
        self.buttons
            .lock()
            .iter()
            .filter(|(b, d)| *b == button && *d == down)
            .count()
    }

    /// Make `set_suppressed(true)` fail, simulating a refused hook.
    pub fn set_fail_suppression(&self, fail: bool) {
        self.fail_suppression.store(fail, Ordering::SeqCst);
    }

    /// Forget all recorded calls (state flags are preserved).
    pub fn clear_recorded(&self) {
        self.moves.lock().clear();
        self.suppression_calls.lock().clear();
        self.buttons.lock().clear();
    }
}

impl PointerOps for MockPointerOps {
    fn cursor_pos(&self) -> Option<(i32, i32)> {
        Some(*self.pos.lock())
    }

    fn set_cursor_pos(&self, x: i32, y: i32) -> Result<()> {
        *self.pos.lock() = (x, y);
        self.moves.lock().push((x, y));
        Ok(())
    }

    fn set_suppressed(&self, active: bool) -> Result<()> {
        if active && self.fail_suppression.load(Ordering::SeqCst) {
            return Err(crate::Error::SuppressionInstall);
        }
        if self.suppressed.swap(active, Ordering::SeqCst) != active {
            self.suppression_calls.lock().push(active);
        }
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<()> {
        self.buttons.lock().push((button, true));
        Ok(())
    }

    fn button_up(&self, button: MouseButton) -> Result<()> {
        self.buttons.lock().push((button, false));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_moves_and_buttons() {
        let ops = MockPointerOps::new();
        ops.set_cursor_pos(5, 6).unwrap();
        ops.button_down(MouseButton::Right).unwrap();
        ops.button_up(MouseButton::Right).unwrap();
        assert_eq!(ops.cursor_pos(), Some((5, 6)));
        assert_eq!(ops.moves(), vec![(5, 6)]);
        assert_eq!(ops.button_count(MouseButton::Right, true), 1);
        assert_eq!(ops.button_count(MouseButton::Right, false), 1);
    }

    #[test]
    fn mock_suppression_records_transitions_only() {
        let ops = MockPointerOps::new();
        ops.set_suppressed(true).unwrap();
        ops.set_suppressed(true).unwrap();
        ops.set_suppressed(false).unwrap();
        assert_eq!(ops.suppression_calls(), vec![true, false]);
        assert!(!ops.suppressed());
    }

    #[test]
    fn mock_suppression_failure() {
        let ops = MockPointerOps::new();
        ops.set_fail_suppression(true);
        assert!(ops.set_suppressed(true).is_err());
        assert!(!ops.suppressed());
    }
}
