//! Surface that streams frames to a network LED controller over UDP.
//!
//! The frame is sent in physical wiring order as raw `r g b` bytes, split
//! into datagrams of at most [`PIXELS_PER_DATAGRAM`] pixels.  Each datagram
//! starts with the index of its first pixel as a big-endian `u16`:
//!
//! ```text
//! ┌──────────────┬─────┬─────┬─────┬─────┬─────┬─────┬───
//! │ start (u16be)│ r₀  │ g₀  │ b₀  │ r₁  │ g₁  │ b₁  │ …
//! └──────────────┴─────┴─────┴─────┴─────┴─────┴─────┴───
//! ```
//!
//! The controller is expected to latch a frame when it receives the
//! datagram containing the last pixel.

use std::net::{SocketAddr, UdpSocket};

use pixelflut_core::{PixelSurface, Rgb, SurfaceError, Topology};
use tracing::{debug, info};

/// Largest number of pixels in one datagram (1442 bytes on the wire).
pub const PIXELS_PER_DATAGRAM: usize = 480;

pub struct UdpStripSurface {
    socket: UdpSocket,
    target: SocketAddr,
    topology: Topology,
    /// Pending frame in physical order.
    pixels: Vec<Rgb>,
    ready: bool,
}

impl UdpStripSurface {
    /// Opens an unbound-port UDP socket aimed at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Io`] if no local socket can be created.
    pub fn connect(target: SocketAddr, topology: Topology) -> Result<Self, SurfaceError> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)?;
        info!("udp strip surface sending to {target}");
        Ok(Self {
            socket,
            target,
            pixels: vec![Rgb::BLACK; topology.len()],
            topology,
            ready: false,
        })
    }
}

/// Splits a physical-order frame into controller datagrams.
pub fn encode_frame(pixels: &[Rgb]) -> Vec<Vec<u8>> {
    pixels
        .chunks(PIXELS_PER_DATAGRAM)
        .enumerate()
        .map(|(n, chunk)| {
            let start = (n * PIXELS_PER_DATAGRAM) as u16;
            let mut datagram = Vec::with_capacity(2 + chunk.len() * 3);
            datagram.extend_from_slice(&start.to_be_bytes());
            for p in chunk {
                datagram.extend_from_slice(&[p.r, p.g, p.b]);
            }
            datagram
        })
        .collect()
}

impl PixelSurface for UdpStripSurface {
    fn setup(&mut self, initial_brightness: u8) -> Result<(), SurfaceError> {
        debug!(brightness = initial_brightness, "udp strip surface setup");
        self.ready = true;
        Ok(())
    }

    fn set_brightness(&mut self, _value: u8) -> Result<(), SurfaceError> {
        // Frames arrive pre-scaled.
        Ok(())
    }

    fn fill(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.pixels.fill(color);
        Ok(())
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb) -> Result<(), SurfaceError> {
        let index = self
            .topology
            .index(x, y)
            .ok_or(SurfaceError::OutOfRange {
                x,
                y,
                width: self.topology.width(),
                height: self.topology.height(),
            })?;
        self.pixels[index] = color;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        if !self.ready {
            return Err(SurfaceError::NotInitialised);
        }
        for datagram in encode_frame(&self.pixels) {
            self.socket.send_to(&datagram, self.target)?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pixelflut_core::{Origin, WiringOrder};

    use super::*;

    #[test]
    fn test_encode_frame_splits_at_datagram_limit() {
        // Arrange
        let pixels = vec![Rgb::new(1, 2, 3); PIXELS_PER_DATAGRAM + 20];

        // Act
        let datagrams = encode_frame(&pixels);

        // Assert
        assert_eq!(datagrams.len(), 2);
        assert_eq!(datagrams[0].len(), 2 + PIXELS_PER_DATAGRAM * 3);
        assert_eq!(&datagrams[0][..5], &[0, 0, 1, 2, 3]);
        assert_eq!(datagrams[1].len(), 2 + 20 * 3);
        assert_eq!(&datagrams[1][..2], &480u16.to_be_bytes());
    }

    #[test]
    fn test_flush_before_setup_is_rejected() {
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let mut surface = UdpStripSurface::connect(target, Topology::row_major(2, 2)).unwrap();

        assert!(matches!(surface.flush(), Err(SurfaceError::NotInitialised)));
    }

    #[test]
    fn test_flush_sends_pixels_in_physical_order() {
        // Arrange: a 2x2 serpentine layout reverses the second row.
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let topology = Topology::new(2, 2, WiringOrder::SerpentineRows, Origin::TopLeft);
        let mut surface =
            UdpStripSurface::connect(receiver.local_addr().unwrap(), topology).unwrap();
        surface.setup(255).unwrap();
        surface.set_pixel(0, 1, Rgb::RED).unwrap();
        surface.set_pixel(1, 1, Rgb::GREEN).unwrap();

        // Act
        surface.flush().unwrap();

        // Assert
        let mut buf = [0u8; 64];
        let len = receiver.recv(&mut buf).unwrap();
        assert_eq!(
            &buf[..len],
            &[0, 0, 0, 0, 0, 0, 0, 0, 0, 255, 0, 255, 0, 0]
        );
    }

    #[test]
    fn test_set_pixel_off_canvas_is_rejected() {
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let mut surface = UdpStripSurface::connect(target, Topology::row_major(2, 2)).unwrap();

        assert!(surface.set_pixel(5, 0, Rgb::RED).is_err());
    }
}
