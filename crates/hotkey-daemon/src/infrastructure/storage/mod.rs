//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML configuration file from
//! the platform-appropriate directory and provides the stock bindings when
//! the file does not exist yet (first run).

pub mod config;
