//! Win32 `WH_KEYBOARD_LL` integration.
//!
//! The hook procedure is a free `extern "system"` function, so the
//! registration table is published through a process-global cell before the
//! hook is installed. The hook thread runs a classic `GetMessageW` pump; low
//! level hooks only deliver while their installing thread pumps messages,
//! and `WM_QUIT` posted from [`SysControl::stop`] ends the pump.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use crossbeam_channel::Sender;
use once_cell::sync::OnceCell;
use tracing::{debug, trace, warn};
use windows::Win32::{
    Foundation::{LPARAM, LRESULT, WPARAM},
    System::Threading::GetCurrentThreadId,
    UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, HC_ACTION, KBDLLHOOKSTRUCT, LLKHF_INJECTED,
        MSG, PostThreadMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx,
        WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
    },
};

use crate::{Error, EventKind, HookCtx};

/// Global context consulted by the hook procedure.
static CTX: OnceCell<Arc<HookCtx>> = OnceCell::new();

/// Control handle used to stop the hook thread from other threads.
pub(crate) struct SysControl {
    thread_id: AtomicU32,
}

impl SysControl {
    pub(crate) fn new() -> Self {
        Self {
            thread_id: AtomicU32::new(0),
        }
    }

    fn set_thread(&self, id: u32) {
        self.thread_id.store(id, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        let id = self.thread_id.swap(0, Ordering::SeqCst);
        if id != 0 {
            unsafe {
                let _ = PostThreadMessageW(id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
        }
    }
}

/// Install the hook on this thread and pump messages until `WM_QUIT`.
pub(crate) fn run_hook_thread(
    ctx: Arc<HookCtx>,
    ready: Sender<crate::Result<()>>,
    ctrl: Arc<SysControl>,
) {
    if CTX.set(ctx).is_err() {
        warn!("keyboard_hook_already_installed");
        let _ = ready.send(Err(Error::AlreadyInstalled));
        return;
    }

    debug!("installing_keyboard_hook");
    let hook = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) }
    {
        Ok(h) => h,
        Err(err) => {
            warn!(%err, "keyboard_hook_install_failed");
            let _ = ready.send(Err(Error::HookInstall));
            return;
        }
    };

    ctrl.set_thread(unsafe { GetCurrentThreadId() });
    let _ = ready.send(Ok(()));
    debug!("keyboard_hook_pump_started");

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(hook);
    }
    debug!("keyboard_hook_pump_exited");
}

/// The low-level keyboard hook procedure.
///
/// Returns `LRESULT(1)` to swallow the event; otherwise chains to the next
/// hook. Must stay fast: Windows blocks input delivery until it returns.
unsafe extern "system" fn keyboard_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code != HC_ACTION as i32 {
        return unsafe { CallNextHookEx(None, code, wparam, lparam) };
    }
    let Some(ctx) = CTX.get() else {
        return unsafe { CallNextHookEx(None, code, wparam, lparam) };
    };
    let data = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };

    // Never react to injected input, ours or anyone else's.
    if data.dwExtraInfo == eventtag::MPIN_TAG || (data.flags.0 & LLKHF_INJECTED.0) != 0 {
        trace!(scan_code = data.scanCode, "ignoring_injected_event");
        return unsafe { CallNextHookEx(None, code, wparam, lparam) };
    }

    let kind = match wparam.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => EventKind::KeyDown,
        WM_KEYUP | WM_SYSKEYUP => EventKind::KeyUp,
        _ => return unsafe { CallNextHookEx(None, code, wparam, lparam) },
    };

    let decision = ctx.dispatch(data.scanCode, kind);
    if decision.suppress() {
        trace!(scan_code = data.scanCode, ?kind, "suppressing_event");
        return LRESULT(1);
    }
    unsafe { CallNextHookEx(None, code, wparam, lparam) }
}
