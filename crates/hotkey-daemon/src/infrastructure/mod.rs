//! Infrastructure layer for the hotkey daemon.
//!
//! Contains OS-facing adapters: low-level input hooks, synthetic key release,
//! the session-lock detector, and configuration file storage. Every adapter has
//! an in-memory mock next to it for tests.
//!
//! **Dependency rule**: this layer may depend on `hotkey_core`, but MUST NOT
//! be imported by the `application` layer except through the traits defined
//! here.

pub mod input_capture;
pub mod key_release;
pub mod session;
pub mod storage;
