//! HotkeyEngine: wires hooks, tracker, registry, queue and watchdog together.
//!
//! # Event path
//!
//! ```text
//! hook thread ──► handle_event
//!                   │  normalize (no lock)
//!                   │  snapshot registry Arc (short read lock)
//!                   ▼
//!                 tracker lock ── press / release ── Completion?
//!                   │                                   │
//!                   │                  Matched(action) ─┴─► DispatchQueue::push
//!                   │                  Recorded(chord) ───► record_chord waiter
//!                   ▼
//!                 unlock, return to the OS
//! ```
//!
//! # Concurrency
//!
//! - The tracker sits behind one `Mutex`, taken by both hook threads. The
//!   critical section is a few set operations and one hash lookup.
//! - The registry is an `Arc<ChordRegistry>` behind an `RwLock`. Reload
//!   builds the new registry outside the lock and swaps the pointer, so an
//!   in-flight event sees the old or the new mapping in full.
//! - Lifecycle calls (`start`, `stop`, watchdog restarts) are serialized by
//!   a separate lifecycle mutex. The watchdog only ever `try_lock`s it, so
//!   `stop()` can join the watchdog while holding it.
//! - Hook sinks and the watchdog hold a `Weak` reference to the engine
//!   internals, so dropping the engine is enough to tear everything down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError, Weak};
use std::time::{Duration, Instant};

use hotkey_core::{
    BindingSpec, Chord, ChordRegistry, ChordTracker, Completion, DuplicatePolicy, KeyMapper,
    RegistryError, TrackerMode, TrackerSnapshot,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::dispatch_queue::{ActionExecutor, DispatchQueue};
use super::health_monitor::{HealthMonitor, ListenerSupervisor, MonitorSettings, TickOutcome};
use crate::infrastructure::input_capture::{
    CaptureError, EventSink, HookKind, InputHook, RawInputEvent,
};
use crate::infrastructure::key_release::{release_on_stop_tokens, KeyReleaser};
use crate::infrastructure::session::LockDetector;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start input capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("invalid hotkey configuration: {0}")]
    Registry(#[from] RegistryError),
    #[error("engine is not running")]
    NotRunning,
    #[error("a chord recording is already in progress")]
    RecordingInProgress,
}

/// Engine tuning, usually taken from the `[engine]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineSettings {
    pub duplicate_policy: DuplicatePolicy,
    pub monitor: MonitorSettings,
}

/// The OS-facing collaborators the engine drives.
pub struct EngineAdapters {
    pub keyboard: Arc<dyn InputHook>,
    pub mouse: Arc<dyn InputHook>,
    pub releaser: Arc<dyn KeyReleaser>,
    pub session: Arc<dyn LockDetector>,
    pub executor: Arc<dyn ActionExecutor>,
}

/// System-wide hotkey engine.
///
/// Dropping the engine stops it.
pub struct HotkeyEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    policy: DuplicatePolicy,
    tracker: Mutex<ChordTracker>,
    registry: RwLock<Arc<ChordRegistry>>,
    keyboard: Arc<dyn InputHook>,
    mouse: Arc<dyn InputHook>,
    releaser: Arc<dyn KeyReleaser>,
    session: Arc<dyn LockDetector>,
    queue: DispatchQueue,
    monitor: HealthMonitor,
    running: AtomicBool,
    lifecycle: Mutex<()>,
    recording: Mutex<Option<Sender<Chord>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HotkeyEngine {
    /// Creates a stopped engine with an empty registry.
    pub fn new(settings: EngineSettings, adapters: EngineAdapters) -> Self {
        let inner = EngineInner {
            policy: settings.duplicate_policy,
            tracker: Mutex::new(ChordTracker::new(TrackerMode::Dispatch)),
            registry: RwLock::new(Arc::new(ChordRegistry::empty())),
            keyboard: adapters.keyboard,
            mouse: adapters.mouse,
            releaser: adapters.releaser,
            session: adapters.session,
            queue: DispatchQueue::new(adapters.executor),
            monitor: HealthMonitor::new(settings.monitor),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            recording: Mutex::new(None),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Installs both hooks and starts the dispatch consumer and watchdog.
    ///
    /// Calling `start` on a running engine does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Capture`] if the OS refuses either hook. Nothing
    /// is left installed in that case, and the start is not retried.
    pub fn start(&self) -> Result<(), EngineError> {
        let inner = &self.inner;
        let _guard = lock(&inner.lifecycle);
        if inner.running.load(Ordering::SeqCst) {
            debug!("engine already running");
            return Ok(());
        }

        inner.reset_state();
        inner.keyboard.install(inner.event_sink())?;
        if let Err(e) = inner.mouse.install(inner.event_sink()) {
            inner.keyboard.uninstall();
            return Err(e.into());
        }
        inner.queue.start_consumer();

        let supervisor: Arc<dyn ListenerSupervisor> =
            Arc::new(EngineSupervisor(Arc::downgrade(inner)));
        inner.monitor.start(supervisor, Arc::clone(&inner.session));

        inner.running.store(true, Ordering::SeqCst);
        info!("hotkey engine started");
        Ok(())
    }

    /// Stops the engine.
    ///
    /// Order: watchdog, hooks, synthetic release of held modifiers, tracker
    /// reset, then the dispatch queue drains and its consumer exits. Calling
    /// `stop` on a stopped engine does nothing.
    ///
    /// Safe from any thread, including an executor running on the dispatch
    /// thread; that consumer finishes the current action and then exits.
    pub fn stop(&self) {
        let inner = &self.inner;
        let _guard = lock(&inner.lifecycle);
        if !inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        inner.monitor.stop();
        inner.keyboard.uninstall();
        inner.mouse.uninstall();
        if let Err(e) = inner.releaser.release_keys(&release_on_stop_tokens()) {
            warn!("failed to release modifier keys: {e}");
        }
        inner.reset_state();
        inner.queue.stop_consumer();
        // Wakes a pending record_chord with "no chord".
        lock(&inner.recording).take();
        info!("hotkey engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Replaces the registry with one built from `bindings`.
    ///
    /// Safe to call at any time, from any thread, running or not.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Registry`] if the bindings are invalid or
    /// conflict under the configured duplicate policy. The previous registry
    /// stays live.
    pub fn reload_hotkeys(&self, bindings: &[BindingSpec]) -> Result<usize, EngineError> {
        let registry = match ChordRegistry::build(bindings, self.inner.policy) {
            Ok(registry) => registry,
            Err(e) => {
                warn!("hotkey reload rejected; keeping previous bindings: {e}");
                return Err(e.into());
            }
        };
        let count = registry.len();
        *self
            .inner
            .registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(registry);
        info!(bindings = count, "hotkeys loaded");
        Ok(count)
    }

    /// The registry currently used for matching.
    pub fn registry(&self) -> Arc<ChordRegistry> {
        self.inner.current_registry()
    }

    /// Waits for the user to perform one chord and returns it without
    /// dispatching anything.
    ///
    /// Returns `Ok(None)` on timeout, when the engine stops meanwhile, or when
    /// the gesture was a lone left click (the click that dismisses a
    /// recording UI).
    ///
    /// # Errors
    ///
    /// [`EngineError::NotRunning`] if the engine is stopped and
    /// [`EngineError::RecordingInProgress`] if another recording is pending.
    pub fn record_chord(&self, timeout: Duration) -> Result<Option<Chord>, EngineError> {
        let inner = &self.inner;
        if !inner.running.load(Ordering::SeqCst) {
            return Err(EngineError::NotRunning);
        }

        let (tx, rx) = mpsc::channel();
        {
            let mut slot = lock(&inner.recording);
            if slot.is_some() {
                return Err(EngineError::RecordingInProgress);
            }
            *slot = Some(tx);
        }
        lock(&inner.tracker).set_mode(TrackerMode::Record);
        debug!("chord recording started");

        let result = rx.recv_timeout(timeout);

        // Hooks send under this lock, so once the slot is cleared nothing more
        // can arrive and a late chord is already in the channel.
        lock(&inner.recording).take();
        let result = settle_recording(result, &rx);
        {
            let mut tracker = lock(&inner.tracker);
            if tracker.mode() == TrackerMode::Record {
                tracker.set_mode(TrackerMode::Dispatch);
            }
        }

        match result {
            Ok(chord) if is_lone_left_click(&chord) => {
                debug!("recording dismissed by left click");
                Ok(None)
            }
            Ok(chord) => {
                info!(%chord, "chord recorded");
                Ok(Some(chord))
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!("chord recording timed out");
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// `true` while a [`record_chord`](Self::record_chord) call is waiting
    /// for a gesture.
    pub fn is_recording(&self) -> bool {
        lock(&self.inner.tracker).mode() == TrackerMode::Record
    }

    /// Sorted copy of the tracker state.
    pub fn tracker_snapshot(&self) -> TrackerSnapshot {
        lock(&self.inner.tracker).snapshot()
    }

    /// Runs one watchdog tick now, on the calling thread.
    pub fn check_health(&self) -> TickOutcome {
        let supervisor = EngineSupervisor(Arc::downgrade(&self.inner));
        self.inner
            .monitor
            .tick_now(&supervisor, self.inner.session.as_ref(), Instant::now())
    }

    /// Feeds one event through the same path the hooks use.
    pub fn handle_event(&self, event: RawInputEvent) {
        self.inner.handle_event(event);
    }
}

impl Drop for HotkeyEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Picks up a chord that was sent after the wait timed out but before the
/// waiter slot was cleared.
fn settle_recording(
    result: Result<Chord, RecvTimeoutError>,
    rx: &Receiver<Chord>,
) -> Result<Chord, RecvTimeoutError> {
    match result {
        Err(RecvTimeoutError::Timeout) => rx.try_recv().map_err(|_| RecvTimeoutError::Timeout),
        other => other,
    }
}

fn is_lone_left_click(chord: &Chord) -> bool {
    chord.len() == 1 && chord.contains("mouse_left")
}

impl EngineInner {
    fn current_registry(&self) -> Arc<ChordRegistry> {
        Arc::clone(
            &self
                .registry
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    fn event_sink(self: &Arc<Self>) -> EventSink {
        let weak = Arc::downgrade(self);
        Arc::new(move |event: RawInputEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(event);
            }
        })
    }

    fn handle_event(&self, event: RawInputEvent) {
        let now = Instant::now();
        let (token, pressed) = match event {
            RawInputEvent::KeyDown { key, .. } => (KeyMapper::normalize_key(key), true),
            RawInputEvent::KeyUp { key, .. } => (KeyMapper::normalize_key(key), false),
            RawInputEvent::MouseButtonDown { button, .. } => {
                (Some(KeyMapper::normalize_button(button)), true)
            }
            RawInputEvent::MouseButtonUp { button, .. } => {
                (Some(KeyMapper::normalize_button(button)), false)
            }
        };
        let Some(token) = token else {
            return;
        };
        let registry = self.current_registry();

        let mut tracker = lock(&self.tracker);
        if pressed {
            tracker.press(token, now);
            return;
        }
        let completion = tracker.release(&token, &registry);
        match completion {
            Some(Completion::Matched(action)) => {
                debug!(%action, "chord matched");
                self.queue.push(action);
            }
            Some(Completion::Recorded(chord)) => {
                tracker.set_mode(TrackerMode::Dispatch);
                drop(tracker);
                let mut waiter = lock(&self.recording);
                match waiter.take() {
                    Some(tx) => {
                        let _ = tx.send(chord);
                    }
                    None => debug!(%chord, "recorded chord with no waiter; dropped"),
                }
            }
            None => {}
        }
    }

    fn reset_state(&self) {
        lock(&self.tracker).reset();
    }

    fn listeners_alive(&self) -> bool {
        self.keyboard.is_alive() && self.mouse.is_alive() && self.queue.is_consumer_alive()
    }

    fn restart_listeners(self: &Arc<Self>) {
        let _guard = match self.lifecycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            // start/stop in progress; the next tick will look again.
            Err(TryLockError::WouldBlock) => return,
        };
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        for hook in [&self.keyboard, &self.mouse] {
            let kind: HookKind = hook.kind();
            hook.uninstall();
            match hook.install(self.event_sink()) {
                Ok(()) => info!(%kind, "hook reinstalled"),
                Err(e) => error!(%kind, "failed to reinstall hook: {e}"),
            }
        }
        self.queue.start_consumer();
        self.reset_state();
    }
}

/// [`ListenerSupervisor`] view of the engine used by the watchdog.
struct EngineSupervisor(Weak<EngineInner>);

impl ListenerSupervisor for EngineSupervisor {
    fn listeners_alive(&self) -> bool {
        // A dropped engine has nothing to supervise.
        self.0.upgrade().map_or(true, |inner| inner.listeners_alive())
    }

    fn restart_listeners(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.restart_listeners();
        }
    }

    fn reset_state(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.reset_state();
        }
    }

    fn gesture_idle_for(&self, now: Instant) -> Option<Duration> {
        let inner = self.0.upgrade()?;
        let tracker = lock(&inner.tracker);
        if tracker.is_idle() {
            return None;
        }
        tracker.idle_for(now)
    }
}
