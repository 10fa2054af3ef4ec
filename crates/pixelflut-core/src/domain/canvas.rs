//! The shared canvas every client draws on.
//!
//! [`Framebuffer`] stores the *logical* colour of every cell exactly as
//! clients wrote it.  Global brightness and the power switch are kept next to
//! the cells but are only applied on the way out, inside [`Framebuffer::flush`].
//! Changing brightness therefore never loses colour precision: dimming to 1 %
//! and back to 100 % restores the original picture without any client
//! resending a pixel.

use crate::domain::color::{Rgb, FULL_BRIGHTNESS};
use crate::domain::topology::Topology;
use crate::surface::{PixelSurface, SurfaceError};

/// Logical pixel grid with global brightness and power state.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    topology: Topology,
    /// Cells in physical wiring order; index through `topology`.
    cells: Vec<Rgb>,
    brightness: u8,
    power: bool,
}

impl Framebuffer {
    /// Creates an all-black framebuffer at full brightness, powered on.
    pub fn new(topology: Topology) -> Self {
        let cells = vec![Rgb::BLACK; topology.len()];
        Self {
            topology,
            cells,
            brightness: FULL_BRIGHTNESS,
            power: true,
        }
    }

    /// Shorthand for a raster-wired canvas.
    pub fn with_size(width: u16, height: u16) -> Self {
        Self::new(Topology::row_major(width, height))
    }

    pub fn width(&self) -> u16 {
        self.topology.width()
    }

    pub fn height(&self) -> u16 {
        self.topology.height()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Stored (unscaled) colour of `(x, y)`, or `None` off the canvas.
    pub fn get(&self, x: u16, y: u16) -> Option<Rgb> {
        self.topology.index(x, y).map(|i| self.cells[i])
    }

    /// Writes one cell.  Returns `false` (and writes nothing) when `(x, y)`
    /// lies off the canvas.
    pub fn set(&mut self, x: u16, y: u16, color: Rgb) -> bool {
        match self.topology.index(x, y) {
            Some(i) => {
                self.cells[i] = color;
                true
            }
            None => false,
        }
    }

    /// Writes every cell.
    pub fn fill(&mut self, color: Rgb) {
        self.cells.fill(color);
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn power(&self) -> bool {
        self.power
    }

    pub fn set_power(&mut self, on: bool) {
        self.power = on;
    }

    /// The colour `flush` would emit for `(x, y)`: stored colour × brightness
    /// fraction, or black while powered off.
    pub fn rendered(&self, x: u16, y: u16) -> Option<Rgb> {
        let stored = self.get(x, y)?;
        Some(if self.power {
            stored.scaled(self.brightness)
        } else {
            Rgb::BLACK
        })
    }

    /// Copies the scaled frame into `surface` and asks it to transmit.
    ///
    /// While powered off the surface is filled black instead; stored colours
    /// are untouched either way.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error the surface reports.
    pub fn flush(&self, surface: &mut dyn PixelSurface) -> Result<(), SurfaceError> {
        if self.power {
            for y in 0..self.height() {
                for x in 0..self.width() {
                    if let Some(color) = self.rendered(x, y) {
                        surface.set_pixel(x, y, color)?;
                    }
                }
            }
        } else {
            surface.fill(Rgb::BLACK)?;
        }
        surface.flush()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
