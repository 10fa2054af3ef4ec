//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file, fills in
//! defaults for anything missing and validates the result before the server
//! binds a single socket.

pub mod config;
