//! In-process mock of the hook seam for tests on any platform.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{Decision, EventKind, Handler, HookApi, HookCtx, Registration, Result, error::Error};

/// Mock [`HookApi`] that delivers synthetic events synchronously.
///
/// `send` plays the role of the OS: it dispatches through the same
/// registration table the real hook uses and returns the effective
/// suppression decision, so tests can assert on exactly what the OS would
/// have been told.
#[derive(Clone)]
pub struct MockHookApi {
    ctx: Arc<HookCtx>,
    fail_register: Arc<AtomicBool>,
}

impl MockHookApi {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self {
            ctx: Arc::new(HookCtx::new()),
            fail_register: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent `register` calls fail, simulating a hook the OS
    /// refused to install.
    pub fn set_fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    /// Deliver a synthetic key event as the OS would, returning the
    /// decision the hook would have applied to the physical event.
    pub fn send(&self, scan_code: u32, kind: EventKind) -> Decision {
        self.ctx.dispatch(scan_code, kind)
    }

    /// Press and release a key, returning both decisions.
    pub fn tap(&self, scan_code: u32) -> (Decision, Decision) {
        (
            self.send(scan_code, EventKind::KeyDown),
            self.send(scan_code, EventKind::KeyUp),
        )
    }

    /// Scan codes with at least one live registration, sorted.
    pub fn registered_codes(&self) -> Vec<u32> {
        self.ctx.registered_codes()
    }
}

impl Default for MockHookApi {
    fn default() -> Self {
        Self::new()
    }
}

impl HookApi for MockHookApi {
    fn register(&self, reg: Registration, handler: Handler) -> Result<u32> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(Error::HookInstall);
        }
        Ok(self.ctx.insert(reg, handler))
    }

    fn unregister(&self, id: u32) -> Result<()> {
        self.ctx.remove(id)
    }
}
