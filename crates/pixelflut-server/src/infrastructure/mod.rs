//! Infrastructure layer for the pixelflut server.
//!
//! Contains the OS-facing adapters: TCP listeners and client connections,
//! pixel surface back-ends, telemetry transports, the remote configuration
//! socket and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pixelflut_core`, but MUST NOT be imported by the `application` layer.

pub mod control;
pub mod network;
pub mod storage;
pub mod surface;
pub mod telemetry;
