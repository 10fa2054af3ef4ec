//! Applies decoded commands to the framebuffer.
//!
//! # Clipping policy
//!
//! Off-canvas coordinates are never an error.  A `SetPixel` outside the
//! canvas is a no-op; a rectangle that overhangs an edge paints exactly its
//! in-bounds cells and silently skips the rest.  None of this is counted as a
//! protocol error, because the command itself was well-formed.
//!
//! Rectangles are walked row-major (`y` outer, `x` inner), which is also the
//! byte order of a `BlitRect` payload.

use tracing::trace;

use crate::domain::canvas::Framebuffer;
use crate::domain::command::Command;
use crate::telemetry::TelemetryCounters;

/// Stateless command executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dispatcher;

impl Dispatcher {
    /// Executes `command` on `fb` and charges `wire_len` bytes plus one
    /// command to `counters`.
    ///
    /// `wire_len` is the exact number of input bytes the decoder consumed for
    /// this command (opcode byte plus payload, or line plus newline).
    pub fn apply(
        fb: &mut Framebuffer,
        command: &Command,
        wire_len: usize,
        counters: &mut TelemetryCounters,
    ) {
        match command {
            Command::Fill { color } => fb.fill(*color),
            Command::SetPixel { x, y, color } => {
                if !fb.set(*x, *y, *color) {
                    trace!(x, y, "pixel off canvas, skipped");
                }
            }
            Command::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                for_each_cell(*x, *y, *width, *height, |cx, cy, _| {
                    fb.set(cx, cy, *color);
                });
            }
            Command::BlitRect {
                x,
                y,
                width,
                height,
                colors,
            } => {
                for_each_cell(*x, *y, *width, *height, |cx, cy, i| {
                    if let Some(color) = colors.get(i) {
                        fb.set(cx, cy, *color);
                    }
                });
            }
        }
        counters.record_command(wire_len);
    }
}

/// Visits every cell of the rectangle in row-major order, passing the
/// absolute coordinates and the cell's offset within the rectangle.
///
/// Cells whose absolute coordinate would overflow `u16` are skipped; they are
/// off any representable canvas anyway.
fn for_each_cell(x: u16, y: u16, width: u16, height: u16, mut f: impl FnMut(u16, u16, usize)) {
    for dy in 0..height {
        let Some(cy) = y.checked_add(dy) else { break };
        for dx in 0..width {
            let Some(cx) = x.checked_add(dx) else { break };
            let offset = usize::from(dy) * usize::from(width) + usize::from(dx);
            f(cx, cy, offset);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
