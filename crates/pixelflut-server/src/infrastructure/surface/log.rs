//! Surface that only logs.  Handy when running without LED hardware.

use pixelflut_core::{PixelSurface, Rgb, SurfaceError};
use tracing::{debug, info};

pub struct LogSurface {
    width: u16,
    height: u16,
    pixels: Vec<Rgb>,
    brightness: u8,
    frames: u64,
}

impl LogSurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; usize::from(width) * usize::from(height)],
            brightness: 0,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of lit pixels and the mean of each channel over the frame.
    fn digest(&self) -> (usize, [u8; 3]) {
        let lit = self.pixels.iter().filter(|&&p| p != Rgb::BLACK).count();
        let mut sums = [0u64; 3];
        for p in &self.pixels {
            sums[0] += u64::from(p.r);
            sums[1] += u64::from(p.g);
            sums[2] += u64::from(p.b);
        }
        let n = self.pixels.len().max(1) as u64;
        let mean = sums.map(|s| (s / n) as u8);
        (lit, mean)
    }
}

impl PixelSurface for LogSurface {
    fn setup(&mut self, initial_brightness: u8) -> Result<(), SurfaceError> {
        self.brightness = initial_brightness;
        info!(
            width = self.width,
            height = self.height,
            brightness = initial_brightness,
            "log surface ready"
        );
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), SurfaceError> {
        self.brightness = value;
        debug!(brightness = value, "log surface brightness");
        Ok(())
    }

    fn fill(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.pixels.fill(color);
        Ok(())
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb) -> Result<(), SurfaceError> {
        if x >= self.width || y >= self.height {
            return Err(SurfaceError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)] = color;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        self.frames += 1;
        let (lit, mean) = self.digest();
        debug!(frame = self.frames, lit, ?mean, "frame");
        Ok(())
    }
}
