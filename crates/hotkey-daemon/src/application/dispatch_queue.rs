//! DispatchQueue: runs matched actions one at a time, off the hook thread.
//!
//! The hook callbacks must return within microseconds, while an action may
//! open a window or talk to the network. Matched actions are therefore pushed
//! onto a FIFO and executed by a single consumer thread (`hotkey-dispatch`),
//! which also guarantees that two chords matched in quick succession never
//! run concurrently.
//!
//! ```text
//! keyboard hook ─┐
//!                ├─► push(action) ─► [ mpsc FIFO ] ─► hotkey-dispatch ─► ActionExecutor::execute
//! mouse hook ────┘                                        (one at a time)
//! ```
//!
//! Shutdown pushes a [`QueueItem::Stop`] sentinel: the consumer drains every
//! action queued before it, then exits. A failing or panicking action is
//! logged and the consumer moves on to the next item.
//!
//! An executor may stop (and restart) the queue from inside `execute`. The
//! consumer cannot join itself, so it is detached instead and exits on its
//! own: on its sentinel, or right after the current action once a newer
//! consumer has been started. Each consumer carries a generation number for
//! this, and ignores sentinels addressed to another generation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use hotkey_core::HotkeyAction;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error type returned by an [`ActionExecutor`].
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("action {0} is not supported by this executor")]
    Unsupported(String),
    #[error("action failed: {0}")]
    Failed(String),
}

/// Runs a matched action. Supplied by the host application.
///
/// Called only from the consumer thread, never concurrently with itself.
#[cfg_attr(test, mockall::automock)]
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, action: &HotkeyAction) -> Result<(), ExecuteError>;
}

/// An item on the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Action(HotkeyAction),
    /// Shutdown sentinel for the consumer of `generation`: everything queued
    /// before it is executed first.
    Stop { generation: u64 },
}

struct Consumer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Single-consumer, multi-producer action queue.
///
/// The channel lives as long as the queue, so actions pushed while the
/// consumer is stopped are kept and run after the next
/// [`start_consumer`](Self::start_consumer).
pub struct DispatchQueue {
    sender: Mutex<Sender<QueueItem>>,
    receiver: Arc<Mutex<Receiver<QueueItem>>>,
    executor: Arc<dyn ActionExecutor>,
    consumer: Mutex<Option<Consumer>>,
    /// Generation of the most recently started consumer.
    generation: Arc<AtomicU64>,
}

impl DispatchQueue {
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender: Mutex::new(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            executor,
            consumer: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueues `action` for execution. Never blocks.
    pub fn push(&self, action: HotkeyAction) {
        // The receiver is owned by `self`, so the channel cannot be closed.
        let _ = lock(&self.sender).send(QueueItem::Action(action));
    }

    /// Starts the consumer thread unless one is already running.
    pub fn start_consumer(&self) {
        let mut consumer = lock(&self.consumer);
        if consumer.as_ref().is_some_and(|c| !c.handle.is_finished()) {
            return;
        }
        if let Some(dead) = consumer.take() {
            warn!("dispatch consumer exited unexpectedly; restarting");
            let _ = dead.handle.join();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let receiver = Arc::clone(&self.receiver);
        let executor = Arc::clone(&self.executor);
        match thread::Builder::new()
            .name("hotkey-dispatch".to_string())
            .spawn(move || run_consumer(generation, current, receiver, executor))
        {
            Ok(handle) => {
                debug!(generation, "dispatch consumer started");
                *consumer = Some(Consumer { generation, handle });
            }
            Err(e) => error!("failed to spawn dispatch consumer: {e}"),
        }
    }

    /// Sends the sentinel and waits for the consumer to drain and exit.
    /// A no-op when no consumer is running.
    ///
    /// Called from the consumer thread itself (an executor stopping the
    /// queue), the sentinel is sent but the thread is detached rather than
    /// joined; it exits once the current action returns.
    pub fn stop_consumer(&self) {
        let Some(consumer) = lock(&self.consumer).take() else {
            return;
        };
        if !consumer.handle.is_finished() {
            let _ = lock(&self.sender).send(QueueItem::Stop {
                generation: consumer.generation,
            });
        }
        if consumer.handle.thread().id() == thread::current().id() {
            debug!("dispatch consumer stopping itself; detached");
            return;
        }
        if consumer.handle.join().is_err() {
            error!("dispatch consumer panicked");
        }
        debug!("dispatch consumer stopped");
    }

    /// `true` while the consumer thread is running.
    pub fn is_consumer_alive(&self) -> bool {
        lock(&self.consumer)
            .as_ref()
            .is_some_and(|c| !c.handle.is_finished())
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.stop_consumer();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Consumer loop: pop, execute, repeat until this generation's sentinel or
/// until a newer consumer takes over.
fn run_consumer(
    generation: u64,
    current: Arc<AtomicU64>,
    receiver: Arc<Mutex<Receiver<QueueItem>>>,
    executor: Arc<dyn ActionExecutor>,
) {
    loop {
        let item = lock(&receiver).recv();
        match item {
            Ok(QueueItem::Action(action)) => {
                execute_one(executor.as_ref(), &action);
                if current.load(Ordering::SeqCst) != generation {
                    debug!(generation, "superseded dispatch consumer exiting");
                    break;
                }
            }
            Ok(QueueItem::Stop { generation: target }) if target == generation => break,
            // Sentinel for a detached consumer that already exited.
            Ok(QueueItem::Stop { .. }) => {}
            Err(_) => break,
        }
    }
}

fn execute_one(executor: &dyn ActionExecutor, action: &HotkeyAction) {
    debug!(%action, "executing action");
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(action))) {
        Ok(Ok(())) => info!(%action, "action completed"),
        Ok(Err(e)) => error!(%action, "action failed: {e}"),
        Err(_) => error!(%action, "action panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotkey_core::SystemAction;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn prompt(id: &str) -> HotkeyAction {
        HotkeyAction::Prompt(id.to_string())
    }

    #[test]
    fn test_actions_execute_in_fifo_order() {
        // Arrange
        let mut executor = MockActionExecutor::new();
        let mut seq = Sequence::new();
        for id in ["first", "second", "third"] {
            executor
                .expect_execute()
                .with(eq(prompt(id)))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }
        let queue = DispatchQueue::new(Arc::new(executor));

        // Act
        queue.start_consumer();
        queue.push(prompt("first"));
        queue.push(prompt("second"));
        queue.push(prompt("third"));
        queue.stop_consumer();

        // Assert: expectations are verified when the mock drops.
        assert!(!queue.is_consumer_alive());
    }

    #[test]
    fn test_failed_action_does_not_stop_consumer() {
        // Arrange
        let mut executor = MockActionExecutor::new();
        executor
            .expect_execute()
            .with(eq(prompt("broken")))
            .times(1)
            .returning(|_| Err(ExecuteError::Failed("boom".to_string())));
        executor
            .expect_execute()
            .with(eq(HotkeyAction::System(SystemAction::ChatWindow)))
            .times(1)
            .returning(|_| Ok(()));
        let queue = DispatchQueue::new(Arc::new(executor));

        // Act
        queue.start_consumer();
        queue.push(prompt("broken"));
        queue.push(HotkeyAction::System(SystemAction::ChatWindow));
        queue.stop_consumer();

        // Assert: both expectations met.
    }

    /// Panics on the `"panics"` prompt and records everything else.
    struct PanickyExecutor {
        executed: Mutex<Vec<HotkeyAction>>,
    }

    impl ActionExecutor for PanickyExecutor {
        fn execute(&self, action: &HotkeyAction) -> Result<(), ExecuteError> {
            if action.id() == "panics" {
                panic!("executor bug");
            }
            self.executed.lock().unwrap().push(action.clone());
            Ok(())
        }
    }

    #[test]
    fn test_panicking_action_does_not_stop_consumer() {
        // Arrange
        let executor = Arc::new(PanickyExecutor {
            executed: Mutex::new(Vec::new()),
        });
        let queue = DispatchQueue::new(Arc::clone(&executor) as Arc<dyn ActionExecutor>);

        // Act
        queue.start_consumer();
        queue.push(prompt("panics"));
        queue.push(prompt("after"));
        queue.stop_consumer();

        // Assert
        assert_eq!(*executor.executed.lock().unwrap(), vec![prompt("after")]);
    }

    #[test]
    fn test_actions_pushed_while_stopped_run_after_restart() {
        // Arrange
        let mut executor = MockActionExecutor::new();
        executor.expect_execute().times(2).returning(|_| Ok(()));
        let queue = DispatchQueue::new(Arc::new(executor));

        // Act
        queue.push(prompt("early-1"));
        queue.push(prompt("early-2"));
        queue.start_consumer();
        queue.stop_consumer();

        // Assert: times(2) verified on drop.
    }

    #[test]
    fn test_start_consumer_is_idempotent() {
        let executor = MockActionExecutor::new();
        let queue = DispatchQueue::new(Arc::new(executor));

        queue.start_consumer();
        queue.start_consumer();
        assert!(queue.is_consumer_alive());

        queue.stop_consumer();
        assert!(!queue.is_consumer_alive());
    }

    /// Stops (and optionally restarts) its own queue from inside `execute`.
    struct SelfStoppingExecutor {
        queue: Mutex<Option<std::sync::Weak<DispatchQueue>>>,
        restart: bool,
        executed: Mutex<Vec<HotkeyAction>>,
        stop_returned: std::sync::atomic::AtomicBool,
    }

    impl SelfStoppingExecutor {
        fn new(restart: bool) -> Arc<Self> {
            Arc::new(Self {
                queue: Mutex::new(None),
                restart,
                executed: Mutex::new(Vec::new()),
                stop_returned: std::sync::atomic::AtomicBool::new(false),
            })
        }
    }

    impl ActionExecutor for SelfStoppingExecutor {
        fn execute(&self, action: &HotkeyAction) -> Result<(), ExecuteError> {
            self.executed.lock().unwrap().push(action.clone());
            if action.id() != "stop" {
                return Ok(());
            }
            let queue = self.queue.lock().unwrap().as_ref().and_then(|q| q.upgrade());
            if let Some(queue) = queue {
                queue.stop_consumer();
                if self.restart {
                    queue.start_consumer();
                }
                self.stop_returned.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !condition() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(2));
        }
    }

    #[test]
    fn test_executor_can_stop_its_own_consumer() {
        // Arrange
        let executor = SelfStoppingExecutor::new(false);
        let queue = Arc::new(DispatchQueue::new(
            Arc::clone(&executor) as Arc<dyn ActionExecutor>
        ));
        *executor.queue.lock().unwrap() = Some(Arc::downgrade(&queue));

        // Act
        queue.start_consumer();
        queue.push(prompt("stop"));
        wait_until(|| executor.stop_returned.load(Ordering::SeqCst));

        // Assert: stop returned normally instead of panicking on a self-join.
        assert!(executor.stop_returned.load(Ordering::SeqCst));
        assert!(!queue.is_consumer_alive());

        // The queue is usable again afterwards.
        queue.start_consumer();
        queue.push(prompt("after"));
        queue.stop_consumer();
        assert_eq!(
            *executor.executed.lock().unwrap(),
            vec![prompt("stop"), prompt("after")]
        );
    }

    #[test]
    fn test_executor_can_restart_its_own_consumer() {
        // Arrange
        let executor = SelfStoppingExecutor::new(true);
        let queue = Arc::new(DispatchQueue::new(
            Arc::clone(&executor) as Arc<dyn ActionExecutor>
        ));
        *executor.queue.lock().unwrap() = Some(Arc::downgrade(&queue));

        // Act: the old consumer's sentinel must not stop the new one.
        queue.start_consumer();
        queue.push(prompt("stop"));
        wait_until(|| executor.stop_returned.load(Ordering::SeqCst));
        queue.push(prompt("first"));
        queue.push(prompt("second"));
        queue.stop_consumer();

        // Assert
        assert_eq!(
            *executor.executed.lock().unwrap(),
            vec![prompt("stop"), prompt("first"), prompt("second")]
        );
    }

    #[test]
    fn test_stop_consumer_without_start_is_noop() {
        let executor = MockActionExecutor::new();
        let queue = DispatchQueue::new(Arc::new(executor));
        queue.stop_consumer();
        assert!(!queue.is_consumer_alive());
    }
}
