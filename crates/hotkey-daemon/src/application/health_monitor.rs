//! HealthMonitor: periodic watchdog for the input listeners.
//!
//! Low-level hooks fail silently. Windows drops a hook whose callback was too
//! slow, and key releases that happen on the secure desktop never reach the
//! hooks at all, leaving the tracker convinced a modifier is still held. The
//! monitor runs on its own thread (`hotkey-watchdog`) and on every tick:
//!
//! 1. Polls the [`LockDetector`]. If the session is locked now, or was locked
//!    on the previous tick, the tracker is reset.
//! 2. Otherwise, if a gesture is in progress and nothing was pressed for
//!    longer than the idle threshold, the tracker is reset.
//! 3. If any listener (either hook or the dispatch consumer) is dead, the
//!    listeners are restarted and the tracker is reset.
//!
//! The thread sleeps for the full interval between ticks by waiting on its
//! stop channel, so `stop()` interrupts the wait immediately.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::infrastructure::session::LockDetector;

/// The operations the monitor needs from whatever owns the listeners.
#[cfg_attr(test, mockall::automock)]
pub trait ListenerSupervisor: Send + Sync {
    /// `true` when every hook thread and the dispatch consumer are running.
    fn listeners_alive(&self) -> bool;
    /// Reinstalls the hooks and restarts the dispatch consumer.
    fn restart_listeners(&self);
    /// Clears all chord tracker state.
    fn reset_state(&self);
    /// Time since the last press if a gesture is in progress, else `None`.
    fn gesture_idle_for(&self, now: Instant) -> Option<Duration>;
}

/// Monitor timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub idle_reset: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            idle_reset: Duration::from_secs(30),
        }
    }
}

/// Why a tick reset the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    Locked,
    /// The session was locked on the previous tick.
    Unlocked,
    Idle,
    ListenerRestart,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub reset: Option<ResetReason>,
    pub restarted: bool,
}

/// State carried from one tick to the next.
#[derive(Debug, Default)]
struct MonitorState {
    was_locked: bool,
}

struct MonitorThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Listener watchdog.
pub struct HealthMonitor {
    settings: MonitorSettings,
    state: Arc<Mutex<MonitorState>>,
    thread: Mutex<Option<MonitorThread>>,
}

impl HealthMonitor {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            settings,
            state: Arc::new(Mutex::new(MonitorState::default())),
            thread: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Starts the watchdog thread. A no-op if it is already running.
    pub fn start(&self, supervisor: Arc<dyn ListenerSupervisor>, detector: Arc<dyn LockDetector>) {
        let mut slot = lock(&self.thread);
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return;
        }
        *lock(&self.state) = MonitorState::default();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let settings = self.settings;
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name("hotkey-watchdog".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(settings.interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut state = lock(&state);
                        run_tick(
                            supervisor.as_ref(),
                            detector.as_ref(),
                            &mut state,
                            settings.idle_reset,
                            Instant::now(),
                        );
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => {
                debug!(interval_ms = settings.interval.as_millis() as u64, "health monitor started");
                *slot = Some(MonitorThread { stop_tx, handle });
            }
            Err(e) => error!("failed to spawn health monitor: {e}"),
        }
    }

    /// Stops the watchdog thread and waits for it to exit.
    ///
    /// From the watchdog thread itself (a supervisor stopping the monitor
    /// during a tick) the thread is signalled but not joined; it exits when
    /// the tick returns.
    pub fn stop(&self) {
        let Some(monitor) = lock(&self.thread).take() else {
            return;
        };
        let _ = monitor.stop_tx.send(());
        if monitor.handle.thread().id() == thread::current().id() {
            debug!("health monitor stopping itself; detached");
            return;
        }
        if monitor.handle.join().is_err() {
            error!("health monitor panicked");
        }
        debug!("health monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        lock(&self.thread)
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Runs one tick on the calling thread, sharing state with the
    /// background thread.
    pub fn tick_now(
        &self,
        supervisor: &dyn ListenerSupervisor,
        detector: &dyn LockDetector,
        now: Instant,
    ) -> TickOutcome {
        let mut state = lock(&self.state);
        run_tick(supervisor, detector, &mut state, self.settings.idle_reset, now)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_tick(
    supervisor: &dyn ListenerSupervisor,
    detector: &dyn LockDetector,
    state: &mut MonitorState,
    idle_reset: Duration,
    now: Instant,
) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    let locked = detector.is_locked();

    if locked || state.was_locked {
        let reason = if locked {
            ResetReason::Locked
        } else {
            ResetReason::Unlocked
        };
        if locked != state.was_locked {
            info!(locked, "session lock state changed; resetting chord state");
        }
        supervisor.reset_state();
        outcome.reset = Some(reason);
    } else if let Some(idle) = supervisor.gesture_idle_for(now) {
        if idle > idle_reset {
            debug!(idle_ms = idle.as_millis() as u64, "stale gesture; resetting chord state");
            supervisor.reset_state();
            outcome.reset = Some(ResetReason::Idle);
        }
    }

    if !supervisor.listeners_alive() {
        warn!("input listener is not running; restarting listeners");
        supervisor.restart_listeners();
        supervisor.reset_state();
        outcome.restarted = true;
        outcome.reset = Some(ResetReason::ListenerRestart);
    }

    state.was_locked = locked;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::session::mock::MockLockDetector;

    const IDLE: Duration = Duration::from_secs(30);

    fn healthy_supervisor() -> MockListenerSupervisor {
        let mut supervisor = MockListenerSupervisor::new();
        supervisor.expect_listeners_alive().return_const(true);
        supervisor.expect_gesture_idle_for().return_const(None::<Duration>);
        supervisor
    }

    #[test]
    fn test_healthy_idle_tick_does_nothing() {
        // Arrange
        let mut supervisor = healthy_supervisor();
        supervisor.expect_reset_state().never();
        supervisor.expect_restart_listeners().never();
        let detector = MockLockDetector::new();
        let monitor = HealthMonitor::new(MonitorSettings::default());

        // Act
        let outcome = monitor.tick_now(&supervisor, &detector, Instant::now());

        // Assert
        assert_eq!(outcome, TickOutcome::default());
    }

    #[test]
    fn test_locked_session_resets_on_lock_and_on_following_tick() {
        // Arrange
        let mut supervisor = healthy_supervisor();
        supervisor.expect_reset_state().times(2).return_const(());
        let detector = MockLockDetector::new();
        let monitor = HealthMonitor::new(MonitorSettings::default());
        let now = Instant::now();

        // Act
        detector.set_locked(true);
        let during = monitor.tick_now(&supervisor, &detector, now);
        detector.set_locked(false);
        let after = monitor.tick_now(&supervisor, &detector, now);
        let settled = monitor.tick_now(&supervisor, &detector, now);

        // Assert
        assert_eq!(during.reset, Some(ResetReason::Locked));
        assert_eq!(after.reset, Some(ResetReason::Unlocked));
        assert_eq!(settled.reset, None);
    }

    #[test]
    fn test_stale_gesture_is_reset() {
        // Arrange
        let mut supervisor = MockListenerSupervisor::new();
        supervisor.expect_listeners_alive().return_const(true);
        supervisor
            .expect_gesture_idle_for()
            .return_const(Some(IDLE + Duration::from_secs(1)));
        supervisor.expect_reset_state().times(1).return_const(());
        let detector = MockLockDetector::new();
        let monitor = HealthMonitor::new(MonitorSettings::default());

        // Act
        let outcome = monitor.tick_now(&supervisor, &detector, Instant::now());

        // Assert
        assert_eq!(outcome.reset, Some(ResetReason::Idle));
        assert!(!outcome.restarted);
    }

    #[test]
    fn test_recent_gesture_is_kept() {
        let mut supervisor = MockListenerSupervisor::new();
        supervisor.expect_listeners_alive().return_const(true);
        supervisor
            .expect_gesture_idle_for()
            .return_const(Some(Duration::from_secs(2)));
        supervisor.expect_reset_state().never();
        let detector = MockLockDetector::new();
        let monitor = HealthMonitor::new(MonitorSettings::default());

        let outcome = monitor.tick_now(&supervisor, &detector, Instant::now());

        assert_eq!(outcome.reset, None);
    }

    #[test]
    fn test_idle_exactly_at_threshold_is_kept() {
        let mut supervisor = MockListenerSupervisor::new();
        supervisor.expect_listeners_alive().return_const(true);
        supervisor.expect_gesture_idle_for().return_const(Some(IDLE));
        supervisor.expect_reset_state().never();
        let detector = MockLockDetector::new();
        let monitor = HealthMonitor::new(MonitorSettings::default());

        assert_eq!(monitor.tick_now(&supervisor, &detector, Instant::now()).reset, None);
    }

    #[test]
    fn test_dead_listener_is_restarted_and_state_reset() {
        // Arrange
        let mut supervisor = MockListenerSupervisor::new();
        supervisor.expect_listeners_alive().return_const(false);
        supervisor.expect_gesture_idle_for().return_const(None::<Duration>);
        supervisor.expect_restart_listeners().times(1).return_const(());
        supervisor.expect_reset_state().times(1).return_const(());
        let detector = MockLockDetector::new();
        let monitor = HealthMonitor::new(MonitorSettings::default());

        // Act
        let outcome = monitor.tick_now(&supervisor, &detector, Instant::now());

        // Assert
        assert!(outcome.restarted);
        assert_eq!(outcome.reset, Some(ResetReason::ListenerRestart));
    }

    /// Stops the monitor that is ticking it, from inside `restart_listeners`.
    struct StoppingSupervisor {
        monitor: Mutex<Option<std::sync::Weak<HealthMonitor>>>,
        stop_returned: std::sync::atomic::AtomicBool,
    }

    impl ListenerSupervisor for StoppingSupervisor {
        fn listeners_alive(&self) -> bool {
            false
        }

        fn restart_listeners(&self) {
            let monitor = lock(&self.monitor).as_ref().and_then(|m| m.upgrade());
            if let Some(monitor) = monitor {
                monitor.stop();
                self.stop_returned
                    .store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        fn reset_state(&self) {}

        fn gesture_idle_for(&self, _now: Instant) -> Option<Duration> {
            None
        }
    }

    #[test]
    fn test_supervisor_can_stop_monitor_from_watchdog_thread() {
        // Arrange
        let supervisor = Arc::new(StoppingSupervisor {
            monitor: Mutex::new(None),
            stop_returned: std::sync::atomic::AtomicBool::new(false),
        });
        let monitor = Arc::new(HealthMonitor::new(MonitorSettings {
            interval: Duration::from_millis(5),
            idle_reset: IDLE,
        }));
        *supervisor.monitor.lock().unwrap() = Some(Arc::downgrade(&monitor));

        // Act
        monitor.start(
            Arc::clone(&supervisor) as Arc<dyn ListenerSupervisor>,
            Arc::new(MockLockDetector::new()),
        );
        let deadline = Instant::now() + Duration::from_secs(5);
        while !supervisor.stop_returned.load(std::sync::atomic::Ordering::SeqCst)
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(2));
        }

        // Assert
        assert!(supervisor.stop_returned.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_background_thread_ticks_until_stopped() {
        // Arrange
        let mut supervisor = healthy_supervisor();
        supervisor.expect_reset_state().never();
        let detector = Arc::new(MockLockDetector::new());
        let monitor = HealthMonitor::new(MonitorSettings {
            interval: Duration::from_millis(5),
            idle_reset: IDLE,
        });

        // Act
        monitor.start(
            Arc::new(supervisor),
            Arc::clone(&detector) as Arc<dyn LockDetector>,
        );
        let deadline = Instant::now() + Duration::from_secs(5);
        while detector.poll_count() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        monitor.stop();

        // Assert
        assert!(detector.poll_count() >= 3);
        assert!(!monitor.is_running());
    }
}
