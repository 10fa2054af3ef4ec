//! # pixelflut-server
//!
//! The server half of pixelflut: a single task that accepts TCP clients,
//! applies their drawing commands to a shared [`pixelflut_core::Framebuffer`]
//! and flushes it to a display at a fixed frame rate.
//!
//! - **`application`** – The deadline-driven control loop and remote
//!   settings.  Talks to the world only through capabilities.
//! - **`infrastructure`** – Sockets, surfaces, telemetry transports and the
//!   configuration file.

pub mod application;
pub mod infrastructure;
