//! Wire protocol: how client bytes become [`Command`](crate::Command)s.
//!
//! Two generations of the protocol coexist, each on its own listener:
//!
//! - [`text`] – the legacy line-oriented dialect (`PX 3 4 ff0080\n`).  It has
//!   no version byte and answers queries inline.
//! - [`binary`] – the current compact dialect.  The server opens with a
//!   three-byte handshake `[version, width, height]`; the client then streams
//!   opcode-tagged commands with fixed-size fields.
//!
//! Both implement the [`decoder::Decoder`] capability, which inspects a byte
//! slice and reports what the next unit of input is without retaining any
//! state of its own.  The caller (the connection) owns the buffer and
//! advances it by however many bytes the decoder says it consumed.

pub mod binary;
pub mod decoder;
pub mod text;

use thiserror::Error;

/// Errors raised by the binary codec.
///
/// These never reach a client: the decoder turns them into
/// [`decoder::Decoded::Incomplete`] or [`decoder::Decoded::Malformed`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The slice is shorter than the command it starts.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The leading byte is not a known opcode.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// A value does not fit its single-byte wire field.
    #[error("{field} = {value} does not fit in one byte")]
    FieldOutOfRange { field: &'static str, value: u32 },

    /// A `BlitRect` carries the wrong number of colours for its size.
    #[error("blit payload has {actual} colours, rectangle needs {expected}")]
    PayloadSizeMismatch { expected: usize, actual: usize },
}
