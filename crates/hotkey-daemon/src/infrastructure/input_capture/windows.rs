//! Windows low-level keyboard and mouse hook implementation.
//!
//! Each [`WindowsInputHook`] owns one dedicated thread that installs its hook
//! (`WH_KEYBOARD_LL` or `WH_MOUSE_LL`) and then pumps a Win32 message loop;
//! Windows calls the hook procedure from inside `GetMessageW` on that thread.
//! Uninstalling posts `WM_QUIT` to the thread, which unhooks and exits.
//!
//! Hook procedures are plain `extern "system"` functions with no user data
//! pointer, so the active sink for each hook kind lives in a static slot.
//! Only one `WindowsInputHook` per [`HookKind`] may be installed at a time.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, RwLock};
use std::thread::{self, JoinHandle};

use hotkey_core::{MouseButton, RawKey};
use tracing::{debug, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, HOOKPROC, KBDLLHOOKSTRUCT, MSG,
    MSLLHOOKSTRUCT, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYDOWN,
    WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_QUIT,
    WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_USER, WM_XBUTTONDOWN,
    WM_XBUTTONUP, XBUTTON1,
};

use super::{CaptureError, EventSink, HookKind, InputHook, RawInputEvent};

/// Sink used by [`keyboard_hook_proc`].
static KEYBOARD_SINK: RwLock<Option<EventSink>> = RwLock::new(None);

/// Sink used by [`mouse_hook_proc`].
static MOUSE_SINK: RwLock<Option<EventSink>> = RwLock::new(None);

fn sink_slot(kind: HookKind) -> &'static RwLock<Option<EventSink>> {
    match kind {
        HookKind::Keyboard => &KEYBOARD_SINK,
        HookKind::Mouse => &MOUSE_SINK,
    }
}

fn set_sink(kind: HookKind, sink: Option<EventSink>) {
    let mut slot = sink_slot(kind)
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = sink;
}

struct HookThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

/// Windows low-level input hook for one device kind.
pub struct WindowsInputHook {
    kind: HookKind,
    thread: Mutex<Option<HookThread>>,
}

impl WindowsInputHook {
    /// Creates a new (uninstalled) hook.
    pub fn new(kind: HookKind) -> Self {
        Self {
            kind,
            thread: Mutex::new(None),
        }
    }

    pub fn keyboard() -> Self {
        Self::new(HookKind::Keyboard)
    }

    pub fn mouse() -> Self {
        Self::new(HookKind::Mouse)
    }

    fn take_thread(&self) -> Option<HookThread> {
        self.thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl InputHook for WindowsInputHook {
    fn kind(&self) -> HookKind {
        self.kind
    }

    fn install(&self, sink: EventSink) -> Result<(), CaptureError> {
        self.uninstall();
        set_sink(self.kind, Some(sink));

        let kind = self.kind;
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let handle = thread::Builder::new()
            .name(format!("hotkey-{kind}-hook"))
            .spawn(move || run_hook_thread(kind, ready_tx))
            .map_err(|e| {
                set_sink(kind, None);
                CaptureError::install_failed(kind, e.to_string())
            })?;

        let outcome = ready_rx
            .recv()
            .unwrap_or_else(|_| Err("hook thread exited before reporting".to_string()));
        match outcome {
            Ok(thread_id) => {
                debug!(%kind, thread_id, "low-level hook installed");
                *self
                    .thread
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) =
                    Some(HookThread { thread_id, handle });
                Ok(())
            }
            Err(reason) => {
                let _ = handle.join();
                set_sink(kind, None);
                Err(CaptureError::install_failed(kind, reason))
            }
        }
    }

    fn uninstall(&self) {
        let Some(hook_thread) = self.take_thread() else {
            return;
        };
        // SAFETY: Posting a message to a thread id is always memory-safe; it
        // fails harmlessly if the thread has already exited.
        let posted = unsafe {
            PostThreadMessageW(hook_thread.thread_id, WM_QUIT, WPARAM(0), LPARAM(0))
        };
        if let Err(e) = posted {
            debug!(kind = %self.kind, "hook thread already gone: {e}");
        }
        if hook_thread.handle.thread().id() == thread::current().id() {
            // Called from inside the sink; the loop exits on WM_QUIT once the
            // hook procedure returns.
            set_sink(self.kind, None);
            debug!(kind = %self.kind, "hook thread stopping itself; detached");
            return;
        }
        if hook_thread.handle.join().is_err() {
            warn!(kind = %self.kind, "hook thread panicked");
        }
        set_sink(self.kind, None);
        debug!(kind = %self.kind, "low-level hook removed");
    }

    fn is_alive(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }
}

impl Drop for WindowsInputHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Entry point for a hook thread.
///
/// Reports the thread id (or the install error) on `ready`, then runs the
/// message loop until `WM_QUIT`.
fn run_hook_thread(kind: HookKind, ready: Sender<Result<u32, String>>) {
    let mut msg = MSG::default();

    // SAFETY: Forces creation of this thread's message queue so that a
    // WM_QUIT posted right after install cannot be lost.
    unsafe {
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
    }
    // SAFETY: GetCurrentThreadId has no preconditions.
    let thread_id = unsafe { GetCurrentThreadId() };

    let (hook_id, proc): (WINDOWS_HOOK_ID, HOOKPROC) = match kind {
        HookKind::Keyboard => (WH_KEYBOARD_LL, Some(keyboard_hook_proc)),
        HookKind::Mouse => (WH_MOUSE_LL, Some(mouse_hook_proc)),
    };

    // SAFETY: SetWindowsHookExW requires the calling thread to run a message
    // loop, which it does below. The module handle of the running executable
    // is valid for the life of the process.
    let hook: HHOOK = match unsafe {
        let module = GetModuleHandleW(PCWSTR::null()).ok().map(HINSTANCE::from);
        SetWindowsHookExW(hook_id, proc, module, 0)
    } {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(thread_id));

    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
    // GetMessageW returns 0 on WM_QUIT and -1 on error.
    unsafe {
        loop {
            let result = GetMessageW(&mut msg, None, 0, 0).0;
            if result == 0 || result == -1 {
                break;
            }
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(hook);
    }
}

/// Hands `event` to the sink for `kind`.
///
/// A panic must never unwind across the FFI boundary, so the sink runs under
/// `catch_unwind`.
fn deliver(kind: HookKind, event: RawInputEvent) {
    let sink = sink_slot(kind)
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    if let Some(sink) = sink {
        if panic::catch_unwind(AssertUnwindSafe(|| sink(event))).is_err() {
            warn!(%kind, "event sink panicked; event dropped");
        }
    }
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// This function is called by Windows from the hook thread's message loop.
/// It must return quickly to avoid hook removal by the OS.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let key = RawKey::vk(kbs.vkCode as u8);
        let time_ms = kbs.time;

        let event = match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(RawInputEvent::KeyDown { key, time_ms }),
            WM_KEYUP | WM_SYSKEYUP => Some(RawInputEvent::KeyUp { key, time_ms }),
            _ => None,
        };
        if let Some(event) = event {
            deliver(HookKind::Keyboard, event);
        }
    }

    // SAFETY: Always forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows from the hook thread's message loop; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
        let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let (x, y, time_ms) = (mhs.pt.x, mhs.pt.y, mhs.time);
        let x_button = || {
            if (mhs.mouseData >> 16) as u16 == XBUTTON1 {
                MouseButton::X1
            } else {
                MouseButton::X2
            }
        };

        let transition = match w_param.0 as u32 {
            WM_LBUTTONDOWN => Some((MouseButton::Left, true)),
            WM_LBUTTONUP => Some((MouseButton::Left, false)),
            WM_RBUTTONDOWN => Some((MouseButton::Right, true)),
            WM_RBUTTONUP => Some((MouseButton::Right, false)),
            WM_MBUTTONDOWN => Some((MouseButton::Middle, true)),
            WM_MBUTTONUP => Some((MouseButton::Middle, false)),
            WM_XBUTTONDOWN => Some((x_button(), true)),
            WM_XBUTTONUP => Some((x_button(), false)),
            // Moves and wheel events carry no chord information.
            _ => None,
        };

        if let Some((button, pressed)) = transition {
            let event = if pressed {
                RawInputEvent::MouseButtonDown { button, x, y, time_ms }
            } else {
                RawInputEvent::MouseButtonUp { button, x, y, time_ms }
            };
            deliver(HookKind::Mouse, event);
        }
    }

    // SAFETY: Always forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
