//! Global low-level keyboard hook for Windows.
//!
//! A single [`Manager`] owns the process-wide `WH_KEYBOARD_LL` hook, running
//! on a dedicated thread with its own message pump. Callers register a
//! handler per scan code; the hook invokes handlers synchronously and uses
//! the returned [`Decision`] to either swallow the physical event (hide it
//! from every other application) or pass it through.
//!
//! Contract notes:
//! - Handlers run on the hook thread and must return promptly; Windows
//!   silently removes hooks that stall its input pipeline.
//! - Handler panics are caught at the hook boundary, logged with the
//!   registration label, and treated as pass-through.
//! - Events injected by this process (tagged extra-info) and by other
//!   injectors (`LLKHF_INJECTED`) are never dispatched, so simulated input
//!   cannot feed back into the hook.
//!
//! [`MockHookApi`] implements the same [`HookApi`] seam without touching the
//! OS, delivering synthetic events synchronously for tests.

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::warn;

mod error;
mod mock;
#[cfg(target_os = "windows")]
mod sys;

pub use error::{Error, Result};
pub use mock::MockHookApi;

/// Whether a key transitioned down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Physical key pressed (includes OS auto-repeat).
    KeyDown,
    /// Physical key released.
    KeyUp,
}

/// A handler's verdict on the physical event it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Swallow the event; no other application sees it.
    Suppress,
    /// Deliver the event normally.
    Pass,
}

impl Decision {
    /// True when the event should be swallowed.
    pub const fn suppress(self) -> bool {
        matches!(self, Self::Suppress)
    }
}

/// Handler invoked on the hook thread for each matching event.
pub type Handler = Arc<dyn Fn(EventKind) -> Decision + Send + Sync>;

/// Parameters of one hook registration.
pub struct Registration {
    /// Hardware scan code this registration matches.
    pub scan_code: u32,
    /// Diagnostic label, reported when the handler fails.
    pub label: String,
}

/// Minimal registration seam shared by the real manager and the test mock.
pub trait HookApi: Send + Sync {
    /// Register `handler` for a scan code; returns a registration id.
    fn register(&self, reg: Registration, handler: Handler) -> Result<u32>;
    /// Remove a registration by id.
    fn unregister(&self, id: u32) -> Result<()>;
}

/// One live registration.
struct Binding {
    scan_code: u32,
    label: String,
    handler: Handler,
}

/// Registration table shared between the public API and the hook thread.
#[derive(Default)]
struct Inner {
    bindings: HashMap<u32, Binding>,
    by_code: HashMap<u32, Vec<u32>>,
    next_id: u32,
}

impl Inner {
    fn insert(&mut self, reg: Registration, handler: Handler) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        self.by_code.entry(reg.scan_code).or_default().push(id);
        self.bindings.insert(
            id,
            Binding {
                scan_code: reg.scan_code,
                label: reg.label,
                handler,
            },
        );
        id
    }

    fn remove(&mut self, id: u32) -> Result<()> {
        let Some(binding) = self.bindings.remove(&id) else {
            return Err(Error::InvalidId);
        };
        if let Some(ids) = self.by_code.get_mut(&binding.scan_code) {
            ids.retain(|&x| x != id);
            if ids.is_empty() {
                self.by_code.remove(&binding.scan_code);
            }
        }
        Ok(())
    }
}

/// Registration table plus dispatch, shared with the hook thread.
pub(crate) struct HookCtx {
    inner: Mutex<Inner>,
}

impl HookCtx {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn insert(&self, reg: Registration, handler: Handler) -> u32 {
        self.inner.lock().insert(reg, handler)
    }

    fn remove(&self, id: u32) -> Result<()> {
        self.inner.lock().remove(id)
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.bindings.clear();
        inner.by_code.clear();
    }

    pub(crate) fn registered_codes(&self) -> Vec<u32> {
        let inner = self.inner.lock();
        let mut codes: Vec<u32> = inner.by_code.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Dispatch one raw event to every registration for `scan_code`.
    ///
    /// Handlers are cloned out of the table before invocation so user code
    /// never runs under the registry lock. Every handler is consulted; the
    /// event is suppressed if any handler asks for it.
    pub(crate) fn dispatch(&self, scan_code: u32, kind: EventKind) -> Decision {
        let targets: Vec<(String, Handler)> = {
            let inner = self.inner.lock();
            match inner.by_code.get(&scan_code) {
                None => return Decision::Pass,
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| inner.bindings.get(id))
                    .map(|b| (b.label.clone(), b.handler.clone()))
                    .collect(),
            }
        };
        let mut suppress = false;
        for (label, handler) in &targets {
            suppress |= dispatch_guarded(label, handler, kind).suppress();
        }
        if suppress {
            Decision::Suppress
        } else {
            Decision::Pass
        }
    }
}

/// Invoke a handler, containing panics at the hook boundary.
fn dispatch_guarded(label: &str, handler: &Handler, kind: EventKind) -> Decision {
    match catch_unwind(AssertUnwindSafe(|| handler(kind))) {
        Ok(decision) => decision,
        Err(_) => {
            warn!(callback = label, "hotkey handler panicked; passing event through");
            Decision::Pass
        }
    }
}

/// The process-wide keyboard hook manager.
///
/// At most one manager may exist per process: the Win32 hook procedure is a
/// free function with a single global context, so a second construction
/// fails with [`Error::AlreadyInstalled`].
pub struct Manager {
    ctx: Arc<HookCtx>,
    #[cfg(target_os = "windows")]
    ctrl: Arc<sys::SysControl>,
    #[cfg(target_os = "windows")]
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl Manager {
    /// Install the keyboard hook and start its message pump.
    ///
    /// Blocks until the hook thread reports readiness; an installation
    /// failure is returned here rather than surfacing later.
    #[cfg(target_os = "windows")]
    pub fn new() -> Result<Self> {
        let ctx = Arc::new(HookCtx::new());
        let ctrl = Arc::new(sys::SysControl::new());
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let thread = {
            let ctx = ctx.clone();
            let ctrl = ctrl.clone();
            std::thread::spawn(move || sys::run_hook_thread(ctx, ready_tx, ctrl))
        };
        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::debug!("keyboard hook installed");
                Ok(Self {
                    ctx,
                    ctrl,
                    thread: Mutex::new(Some(thread)),
                })
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::HookInstall)
            }
        }
    }

    /// The real hook manager is Windows-only; other hosts get an error and
    /// should wire a [`MockHookApi`] instead.
    #[cfg(not(target_os = "windows"))]
    pub fn new() -> Result<Self> {
        Err(Error::Unsupported)
    }

    /// Stop the hook thread and drop every registration. Idempotent.
    pub fn shutdown(&self) {
        #[cfg(target_os = "windows")]
        {
            self.ctrl.stop();
            if let Some(handle) = self.thread.lock().take() {
                let _ = handle.join();
            }
        }
        self.ctx.clear();
    }
}

impl HookApi for Manager {
    fn register(&self, reg: Registration, handler: Handler) -> Result<u32> {
        Ok(self.ctx.insert(reg, handler))
    }

    fn unregister(&self, id: u32) -> Result<()> {
        self.ctx.remove(id)
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
