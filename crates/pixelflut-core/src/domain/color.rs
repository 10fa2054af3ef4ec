//! 24-bit RGB colour cells.

use serde::{Deserialize, Serialize};

/// Brightness value representing 100 % output.
pub const FULL_BRIGHTNESS: u8 = 255;

/// One colour cell: red, green and blue channels of 8 bits each.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a colour from the first three bytes of `bytes`.
    ///
    /// Callers guarantee `bytes.len() >= 3`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    /// Scales every channel by `brightness / 255`, rounding down.
    ///
    /// `scaled(255)` is the identity and `scaled(0)` is black.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pixelflut_core::Rgb;
    ///
    /// let c = Rgb::new(200, 100, 50);
    /// assert_eq!(c.scaled(128), Rgb::new(100, 50, 25));
    /// assert_eq!(c.scaled(255), c);
    /// ```
    pub fn scaled(self, brightness: u8) -> Self {
        let scale = |channel: u8| -> u8 {
            ((u16::from(channel) * u16::from(brightness)) / u16::from(FULL_BRIGHTNESS)) as u8
        };
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Parses exactly six hexadecimal digits (`RRGGBB`, case-insensitive).
    ///
    /// Returns `None` for any other length or for non-hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        // from_str_radix tolerates a leading '+', so check the digits first.
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}
