//! Domain entities for the pixelflut canvas.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no sockets, no timers, no display drivers.
//!
//! # Data flow
//!
//! ```text
//! Command ──► Dispatcher::apply ──► Framebuffer (logical colours)
//!                                        │
//!                                   flush (× brightness × power)
//!                                        ▼
//!                                  PixelSurface sink
//! ```
//!
//! The framebuffer is mutated only by the dispatcher and read only by
//! `flush`; both run on the scheduler's single task, so nothing here needs a
//! lock.

pub mod canvas;
pub mod color;
pub mod command;
pub mod dispatch;

/// Logical-to-physical wiring order.
///
/// See [`topology::Topology`] for the main type.
pub mod topology;
