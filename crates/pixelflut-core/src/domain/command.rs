//! Drawing commands, the common output of both protocol dialects.

use serde::{Deserialize, Serialize};

use crate::domain::color::Rgb;

/// One decoded drawing instruction.
///
/// Coordinates are unsigned and are *not* validated against the canvas here;
/// the [`Dispatcher`](crate::Dispatcher) owns the clipping policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Paint the whole canvas.
    Fill { color: Rgb },
    /// Paint one cell.
    SetPixel { x: u16, y: u16, color: Rgb },
    /// Paint a solid rectangle.
    FillRect {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: Rgb,
    },
    /// Paint a rectangle from per-cell colours, row-major within the
    /// rectangle.  `colors.len()` equals `width * height`.
    BlitRect {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        colors: Vec<Rgb>,
    },
}

impl Command {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Fill { .. } => "fill",
            Command::SetPixel { .. } => "set-pixel",
            Command::FillRect { .. } => "fill-rect",
            Command::BlitRect { .. } => "blit-rect",
        }
    }
}
