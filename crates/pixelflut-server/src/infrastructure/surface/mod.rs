//! Pixel surface back-ends.
//!
//! Every back-end implements [`pixelflut_core::PixelSurface`]; which one runs
//! is decided by `display.surface` in the configuration.

pub mod log;
pub mod memory;
pub mod udp_strip;

use pixelflut_core::{PixelSurface, Topology};
use thiserror::Error;

use crate::infrastructure::storage::config::{ConfigError, DisplayConfig, SurfaceKind};

pub use self::log::LogSurface;
pub use self::memory::{Frame, FrameHandle, MemorySurface};
pub use self::udp_strip::UdpStripSurface;

/// Errors raised while opening a surface.
#[derive(Debug, Error)]
pub enum OpenSurfaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Surface(#[from] pixelflut_core::SurfaceError),
}

/// An opened back-end.
pub struct OpenedSurface {
    pub surface: Box<dyn PixelSurface>,
    /// Present for the memory back-end.
    pub frames: Option<FrameHandle>,
}

/// Opens the back-end selected by `display` for a canvas wired as `topology`.
///
/// # Errors
///
/// Returns [`OpenSurfaceError`] if the `udp-strip` target is invalid or its
/// socket cannot be created.
pub fn open_surface(
    display: &DisplayConfig,
    topology: &Topology,
) -> Result<OpenedSurface, OpenSurfaceError> {
    let (width, height) = (topology.width(), topology.height());
    let opened = match display.surface {
        SurfaceKind::Memory => {
            let surface = MemorySurface::new(width, height);
            let frames = Some(surface.handle());
            OpenedSurface {
                surface: Box::new(surface),
                frames,
            }
        }
        SurfaceKind::Log => OpenedSurface {
            surface: Box::new(LogSurface::new(width, height)),
            frames: None,
        },
        SurfaceKind::UdpStrip => {
            let target = display.strip_target_addr()?;
            OpenedSurface {
                surface: Box::new(UdpStripSurface::connect(target, topology.clone())?),
                frames: None,
            }
        }
    };
    Ok(opened)
}
