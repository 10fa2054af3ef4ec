//! Binary dialect codec.
//!
//! Handshake, sent by the server on connect:
//! ```text
//! [version:1][width:1][height:1]
//! ```
//!
//! Commands, sent by the client, one after another with no framing:
//! ```text
//! 0x01 Fill      [r][g][b]
//! 0x02 SetPixel  [x][y][r][g][b]
//! 0x03 FillRect  [x][y][w][h][r][g][b]
//! 0x04 BlitRect  [x][y][w][h] then w*h × [r][g][b], row-major
//! ```
//! All fields are single unsigned bytes.

use crate::domain::color::Rgb;
use crate::domain::command::Command;
use crate::protocol::decoder::{Decoded, Decoder, Dialect};
use crate::protocol::ProtocolError;

/// Version byte sent in the handshake.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the server's greeting.
pub const HANDSHAKE_LEN: usize = 3;

/// Leading byte of every binary command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Fill = 0x01,
    SetPixel = 0x02,
    FillRect = 0x03,
    BlitRect = 0x04,
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Opcode::Fill),
            0x02 => Ok(Opcode::SetPixel),
            0x03 => Ok(Opcode::FillRect),
            0x04 => Ok(Opcode::BlitRect),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

/// Builds the three-byte greeting for a `width × height` canvas.
///
/// # Errors
///
/// Returns [`ProtocolError::FieldOutOfRange`] if either dimension exceeds 255.
pub fn handshake(width: u16, height: u16) -> Result<[u8; HANDSHAKE_LEN], ProtocolError> {
    Ok([
        PROTOCOL_VERSION,
        byte_field("width", width)?,
        byte_field("height", height)?,
    ])
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one command from the beginning of `bytes`.
///
/// Returns the command and the number of bytes it occupied, so the caller
/// can advance its read cursor.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if `bytes` ends mid-command.
/// - [`ProtocolError::UnknownOpcode`] if the first byte is not an opcode.
///
/// # Examples
///
/// ```rust
/// use pixelflut_core::protocol::binary::decode_command;
/// use pixelflut_core::{Command, Rgb};
///
/// let (cmd, consumed) = decode_command(&[0x02, 3, 4, 0xff, 0x00, 0x80]).unwrap();
/// assert_eq!(cmd, Command::SetPixel { x: 3, y: 4, color: Rgb::new(0xff, 0, 0x80) });
/// assert_eq!(consumed, 6);
/// ```
pub fn decode_command(bytes: &[u8]) -> Result<(Command, usize), ProtocolError> {
    let first = *bytes.first().ok_or(ProtocolError::InsufficientData {
        needed: 1,
        available: 0,
    })?;
    let opcode = Opcode::try_from(first)?;
    let body = &bytes[1..];

    match opcode {
        Opcode::Fill => {
            require(bytes, 4)?;
            Ok((
                Command::Fill {
                    color: Rgb::from_slice(body),
                },
                4,
            ))
        }
        Opcode::SetPixel => {
            require(bytes, 6)?;
            Ok((
                Command::SetPixel {
                    x: u16::from(body[0]),
                    y: u16::from(body[1]),
                    color: Rgb::from_slice(&body[2..]),
                },
                6,
            ))
        }
        Opcode::FillRect => {
            require(bytes, 8)?;
            Ok((
                Command::FillRect {
                    x: u16::from(body[0]),
                    y: u16::from(body[1]),
                    width: u16::from(body[2]),
                    height: u16::from(body[3]),
                    color: Rgb::from_slice(&body[4..]),
                },
                8,
            ))
        }
        Opcode::BlitRect => {
            require(bytes, 5)?;
            let (width, height) = (u16::from(body[2]), u16::from(body[3]));
            let cells = usize::from(width) * usize::from(height);
            let total = 5 + cells * 3;
            require(bytes, total)?;
            let colors = bytes[5..total].chunks_exact(3).map(Rgb::from_slice).collect();
            Ok((
                Command::BlitRect {
                    x: u16::from(body[0]),
                    y: u16::from(body[1]),
                    width,
                    height,
                    colors,
                },
                total,
            ))
        }
    }
}

fn require(bytes: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if bytes.len() < needed {
        Err(ProtocolError::InsufficientData {
            needed,
            available: bytes.len(),
        })
    } else {
        Ok(())
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes `command` in the binary dialect.
///
/// Used by test clients and benchmarks; the server itself never sends
/// commands.
///
/// # Errors
///
/// - [`ProtocolError::FieldOutOfRange`] if any coordinate or size exceeds 255.
/// - [`ProtocolError::PayloadSizeMismatch`] if a `BlitRect` carries the wrong
///   number of colours.
pub fn encode_command(command: &Command) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(wire_len(command));
    match command {
        Command::Fill { color } => {
            buf.push(Opcode::Fill as u8);
            push_color(&mut buf, *color);
        }
        Command::SetPixel { x, y, color } => {
            buf.push(Opcode::SetPixel as u8);
            buf.push(byte_field("x", *x)?);
            buf.push(byte_field("y", *y)?);
            push_color(&mut buf, *color);
        }
        Command::FillRect {
            x,
            y,
            width,
            height,
            color,
        } => {
            buf.push(Opcode::FillRect as u8);
            push_rect(&mut buf, *x, *y, *width, *height)?;
            push_color(&mut buf, *color);
        }
        Command::BlitRect {
            x,
            y,
            width,
            height,
            colors,
        } => {
            let expected = usize::from(*width) * usize::from(*height);
            if colors.len() != expected {
                return Err(ProtocolError::PayloadSizeMismatch {
                    expected,
                    actual: colors.len(),
                });
            }
            buf.push(Opcode::BlitRect as u8);
            push_rect(&mut buf, *x, *y, *width, *height)?;
            for color in colors {
                push_color(&mut buf, *color);
            }
        }
    }
    Ok(buf)
}

/// Number of bytes `command` occupies on the wire.
pub fn wire_len(command: &Command) -> usize {
    match command {
        Command::Fill { .. } => 4,
        Command::SetPixel { .. } => 6,
        Command::FillRect { .. } => 8,
        Command::BlitRect { width, height, .. } => {
            5 + usize::from(*width) * usize::from(*height) * 3
        }
    }
}

fn byte_field(field: &'static str, value: u16) -> Result<u8, ProtocolError> {
    u8::try_from(value).map_err(|_| ProtocolError::FieldOutOfRange {
        field,
        value: u32::from(value),
    })
}

fn push_rect(buf: &mut Vec<u8>, x: u16, y: u16, w: u16, h: u16) -> Result<(), ProtocolError> {
    buf.push(byte_field("x", x)?);
    buf.push(byte_field("y", y)?);
    buf.push(byte_field("width", w)?);
    buf.push(byte_field("height", h)?);
    Ok(())
}

fn push_color(buf: &mut Vec<u8>, color: Rgb) {
    buf.extend_from_slice(&[color.r, color.g, color.b]);
}

// ── Decoder capability ────────────────────────────────────────────────────────

/// The binary dialect behind the [`Decoder`] capability.
#[derive(Debug, Clone)]
pub struct BinaryDecoder {
    greeting: [u8; HANDSHAKE_LEN],
}

impl BinaryDecoder {
    /// # Errors
    ///
    /// Fails if the canvas cannot be advertised in the handshake.
    pub fn new(width: u16, height: u16) -> Result<Self, ProtocolError> {
        Ok(Self {
            greeting: handshake(width, height)?,
        })
    }
}

impl Decoder for BinaryDecoder {
    fn dialect(&self) -> Dialect {
        Dialect::Binary
    }

    fn greeting(&self) -> &[u8] {
        &self.greeting
    }

    fn decode(&mut self, input: &[u8]) -> Decoded {
        match decode_command(input) {
            Ok((command, consumed)) => Decoded::Command { command, consumed },
            Err(ProtocolError::InsufficientData { .. }) => Decoded::Incomplete,
            // Skip just the bad byte and resync on the next one.
            Err(_) => Decoded::Malformed { consumed: 1 },
        }
    }

    fn partial_expires(&self) -> bool {
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
