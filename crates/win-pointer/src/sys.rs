//! Win32 integration: cursor calls, `SendInput` injection, and the
//! `WH_MOUSE_LL` suppression hook.
//!
//! The suppression hook swallows every pointer event that did not originate
//! from an injector, so the pin is never fought by real input while our own
//! simulated button events (tagged with `eventtag::MPIN_TAG`) still pass.
//! Like all low-level hooks it needs a pumping thread; the hook lives
//! exactly as long as its thread, which is started on enable and stopped
//! with `WM_QUIT` on disable.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{debug, warn};
use windows::Win32::{
    Foundation::{LPARAM, LRESULT, POINT, WPARAM},
    System::Threading::GetCurrentThreadId,
    UI::Input::KeyboardAndMouse::{
        INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
        MOUSEINPUT, SendInput,
    },
    UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetCursorPos, GetMessageW, HC_ACTION, LLMHF_INJECTED,
        MSG, MSLLHOOKSTRUCT, PostThreadMessageW, SetCursorPos, SetWindowsHookExW,
        TranslateMessage, UnhookWindowsHookEx, WH_MOUSE_LL, WM_QUIT,
    },
};

use crate::{Error, MouseButton, Result};

/// Read the current cursor position.
pub(crate) fn cursor_pos() -> Option<(i32, i32)> {
    let mut point = POINT::default();
    match unsafe { GetCursorPos(&mut point) } {
        Ok(()) => Some((point.x, point.y)),
        Err(_) => None,
    }
}

/// Force the cursor to the given position.
pub(crate) fn set_cursor_pos(x: i32, y: i32) -> Result<()> {
    unsafe { SetCursorPos(x, y) }.map_err(|err| Error::Os(err.to_string()))
}

/// Inject one simulated button transition, tagged as synthetic.
pub(crate) fn send_button(button: MouseButton, down: bool) -> Result<()> {
    let flags = match (button, down) {
        (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
        (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
        (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
        (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
        (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
        (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
    };
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: eventtag::MPIN_TAG,
            },
        },
    };
    let inserted = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if inserted == 0 {
        warn!(?button, down, "send_input_rejected");
        return Err(Error::Inject);
    }
    Ok(())
}

/// A running pointer-suppression hook; dropping the value without calling
/// [`SuppressionHook::stop`] leaks the thread, so the owner always stops it.
pub(crate) struct SuppressionHook {
    thread_id: u32,
    handle: JoinHandle<()>,
}

impl SuppressionHook {
    /// Start the hook thread; blocks until installation succeeded or failed.
    pub(crate) fn start() -> Result<Self> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let handle = thread::spawn(move || run_suppression_thread(&ready_tx));
        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                debug!("pointer_suppression_enabled");
                Ok(Self { thread_id, handle })
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::SuppressionInstall)
            }
        }
    }

    /// Stop the hook thread and wait for the hook to be removed.
    pub(crate) fn stop(self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        let _ = self.handle.join();
        debug!("pointer_suppression_disabled");
    }
}

/// Install `WH_MOUSE_LL` on this thread and pump messages until `WM_QUIT`.
fn run_suppression_thread(ready: &Sender<Result<u32>>) {
    let hook = match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_suppress_proc), None, 0) }
    {
        Ok(h) => h,
        Err(err) => {
            warn!(%err, "mouse_hook_install_failed");
            let _ = ready.send(Err(Error::SuppressionInstall));
            return;
        }
    };
    let _ = ready.send(Ok(unsafe { GetCurrentThreadId() }));

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(hook);
    }
}

/// Swallow every real pointer event; let injected events through.
unsafe extern "system" fn mouse_suppress_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code != HC_ACTION as i32 {
        return unsafe { CallNextHookEx(None, code, wparam, lparam) };
    }
    let data = unsafe { &*(lparam.0 as *const MSLLHOOKSTRUCT) };
    if data.dwExtraInfo == eventtag::MPIN_TAG || (data.flags & LLMHF_INJECTED) != 0 {
        return unsafe { CallNextHookEx(None, code, wparam, lparam) };
    }
    LRESULT(1)
}
