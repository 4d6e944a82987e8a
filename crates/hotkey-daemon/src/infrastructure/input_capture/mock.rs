//! Mock input hook for unit testing.
//!
//! Allows tests to inject synthetic [`RawInputEvent`]s without requiring a
//! running Windows message loop or OS hooks, and to simulate a hook that the
//! OS has silently removed.
//!
//! Injected events are delivered synchronously on the calling thread, the
//! same way a real hook calls its sink from the hook thread.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{CaptureError, EventSink, HookKind, InputHook, RawInputEvent};

/// A mock implementation of [`InputHook`] that allows tests to inject events.
pub struct MockInputHook {
    kind: HookKind,
    sink: Mutex<Option<EventSink>>,
    alive: AtomicBool,
    installs: AtomicUsize,
    /// When `true`, `install` fails with the kind's install error.
    pub should_fail: AtomicBool,
}

impl MockInputHook {
    /// Creates a new (uninstalled) mock hook.
    pub fn new(kind: HookKind) -> Self {
        Self {
            kind,
            sink: Mutex::new(None),
            alive: AtomicBool::new(false),
            installs: AtomicUsize::new(0),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn keyboard() -> Self {
        Self::new(HookKind::Keyboard)
    }

    pub fn mouse() -> Self {
        Self::new(HookKind::Mouse)
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `false` (and drops the event) if the hook is not alive.
    pub fn inject(&self, event: RawInputEvent) -> bool {
        if !self.alive.load(Ordering::SeqCst) {
            return false;
        }
        let sink = self.sink_guard().clone();
        match sink {
            Some(sink) => {
                sink(event);
                true
            }
            None => false,
        }
    }

    /// Simulates the OS removing the hook: the hook reports dead and stops
    /// delivering events until it is installed again.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn sink_guard(&self) -> std::sync::MutexGuard<'_, Option<EventSink>> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of successful `install` calls so far.
    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl InputHook for MockInputHook {
    fn kind(&self) -> HookKind {
        self.kind
    }

    fn install(&self, sink: EventSink) -> Result<(), CaptureError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(CaptureError::install_failed(self.kind, "mock install failure"));
        }
        *self.sink_guard() = Some(sink);
        self.alive.store(true, Ordering::SeqCst);
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninstall(&self) {
        self.alive.store(false, Ordering::SeqCst);
        *self.sink_guard() = None;
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
