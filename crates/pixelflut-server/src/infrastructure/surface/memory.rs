//! In-process surface that keeps the last flushed frame in memory.
//!
//! Used when the server runs headless and by tests, which hold a
//! [`FrameHandle`] and look at what the display would have shown.

use std::sync::{Arc, Mutex, MutexGuard};

use pixelflut_core::{PixelSurface, Rgb, SurfaceError};

/// The most recently flushed frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<Rgb>,
    pub brightness: u8,
    /// Number of flushes so far.
    pub generation: u64,
}

impl Frame {
    fn blank(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; usize::from(width) * usize::from(height)],
            brightness: 0,
            generation: 0,
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }
}

/// Read access to a [`MemorySurface`]'s flushed frame from elsewhere.
#[derive(Debug, Clone)]
pub struct FrameHandle(Arc<Mutex<Frame>>);

impl FrameHandle {
    /// Copy of the last flushed frame.
    pub fn snapshot(&self) -> Frame {
        lock(&self.0).clone()
    }
}

pub struct MemorySurface {
    pending: Frame,
    shown: Arc<Mutex<Frame>>,
}

impl MemorySurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            pending: Frame::blank(width, height),
            shown: Arc::new(Mutex::new(Frame::blank(width, height))),
        }
    }

    pub fn handle(&self) -> FrameHandle {
        FrameHandle(Arc::clone(&self.shown))
    }
}

// A poisoned lock only means a reader panicked mid-clone; the frame is still usable.
fn lock(frame: &Mutex<Frame>) -> MutexGuard<'_, Frame> {
    frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PixelSurface for MemorySurface {
    fn setup(&mut self, initial_brightness: u8) -> Result<(), SurfaceError> {
        self.pending.brightness = initial_brightness;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), SurfaceError> {
        self.pending.brightness = value;
        Ok(())
    }

    fn fill(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.pending.pixels.fill(color);
        Ok(())
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb) -> Result<(), SurfaceError> {
        let Frame { width, height, .. } = self.pending;
        if x >= width || y >= height {
            return Err(SurfaceError::OutOfRange { x, y, width, height });
        }
        self.pending.pixels[usize::from(y) * usize::from(width) + usize::from(x)] = color;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        self.pending.generation += 1;
        let mut shown = lock(&self.shown);
        shown.clone_from(&self.pending);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
