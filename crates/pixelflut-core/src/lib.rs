//! # pixelflut-core
//!
//! Shared library for the pixelflut server containing the canvas model, the
//! two wire protocol decoders, the command dispatcher and the telemetry
//! counters.
//!
//! It has zero dependencies on sockets, clocks, async runtimes or display
//! hardware, so every rule in here can be unit-tested in isolation.
//!
//! # Architecture overview
//!
//! Pixelflut is a collaborative drawing game: any number of remote clients
//! connect over TCP and stream "set this pixel to this colour" commands at a
//! shared LED canvas.  Whoever writes last wins.
//!
//! - **`domain`** – The canvas itself (`Framebuffer`), how logical
//!   coordinates map onto physical wiring (`Topology`), the `Command` type
//!   and the `Dispatcher` that applies commands to the canvas.
//!
//! - **`protocol`** – How bytes become commands.  Two generations exist: a
//!   line-oriented text dialect (`PX 3 4 ff0080\n`) and a compact binary
//!   dialect (`[0x02, 3, 4, 0xff, 0x00, 0x80]`).  Both implement the
//!   [`Decoder`] capability and produce the same [`Command`] type.
//!
//! - **`telemetry`** – Per-interval counters (commands, bytes, malformed
//!   commands) and the capability through which rates leave the core.
//!
//! - **`surface`** – The capability implemented by display back-ends.

pub mod domain;
pub mod protocol;
pub mod surface;
pub mod telemetry;

pub use domain::canvas::Framebuffer;
pub use domain::color::Rgb;
pub use domain::command::Command;
pub use domain::dispatch::Dispatcher;
pub use domain::topology::{Origin, Topology, WiringOrder};
pub use protocol::decoder::{Decoded, Decoder, Dialect};
pub use protocol::ProtocolError;
pub use surface::{PixelSurface, SurfaceError};
pub use telemetry::{Channel, RateSample, TelemetryAggregator, TelemetryCounters, TelemetrySink};
