//! Application layer for the hotkey daemon.
//!
//! This layer sits between the pure chord logic in `hotkey-core` and the
//! OS-facing adapters in [`crate::infrastructure`]. It depends only on the
//! adapter traits, so every use case here runs against the mocks in tests.
//!
//! # Sub-modules
//!
//! - **`engine`** – The [`engine::HotkeyEngine`]: owns the tracker and the
//!   registry, receives events from both hooks and turns completed chords
//!   into queued actions. Also drives lifecycle, reload and chord recording.
//!
//! - **`dispatch_queue`** – FIFO of matched actions, executed one at a time
//!   on a dedicated consumer thread.
//!
//! - **`health_monitor`** – Watchdog that restarts dead listeners and clears
//!   stuck chord state after a session lock or a long idle gesture.

pub mod dispatch_queue;
pub mod engine;
pub mod health_monitor;
