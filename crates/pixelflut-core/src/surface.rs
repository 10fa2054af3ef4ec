//! The pixel-surface capability: where a flushed frame ends up.
//!
//! A surface is the hardware-facing end of the pipeline.  It may drive an LED
//! strip over SPI, push datagrams to a network controller, or simply keep the
//! frame in memory for tests.  The core never assumes any call is cheap: a
//! surface is allowed to spend real time inside [`PixelSurface::flush`].
//!
//! Brightness scaling happens in the [`Framebuffer`](crate::Framebuffer)
//! before pixels reach the surface, so [`PixelSurface::set_brightness`] is
//! informational for back-ends with no hardware dimming of their own.

use thiserror::Error;

use crate::domain::color::Rgb;

/// Errors a surface back-end can report.
///
/// The scheduler treats every surface call as best-effort: errors are logged
/// and the loop continues.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The underlying transport failed (socket, device file, bus).
    #[error("surface I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The back-end rejected a pixel outside its physical extent.
    #[error("pixel ({x}, {y}) is outside the {width}x{height} surface")]
    OutOfRange {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },

    /// The back-end has not been set up yet.
    #[error("surface not initialised")]
    NotInitialised,
}

/// Display back-end contract.
///
/// Coordinates passed to [`set_pixel`](Self::set_pixel) are logical canvas
/// coordinates; back-ends that need physical wiring order map them through a
/// [`Topology`](crate::Topology) of their own.
#[cfg_attr(test, mockall::automock)]
pub trait PixelSurface {
    /// Prepares the back-end for use with an initial brightness.
    fn setup(&mut self, initial_brightness: u8) -> Result<(), SurfaceError>;

    /// Records the current global brightness.
    fn set_brightness(&mut self, value: u8) -> Result<(), SurfaceError>;

    /// Sets every pixel of the pending frame to `color`.
    fn fill(&mut self, color: Rgb) -> Result<(), SurfaceError>;

    /// Sets one pixel of the pending frame.
    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb) -> Result<(), SurfaceError>;

    /// Transmits the pending frame to the display.
    fn flush(&mut self) -> Result<(), SurfaceError>;
}
