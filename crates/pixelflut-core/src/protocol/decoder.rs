//! The decoding capability shared by both dialects.

use serde::{Deserialize, Serialize};

use crate::domain::command::Command;
use crate::protocol::binary::BinaryDecoder;
use crate::protocol::text::TextDecoder;
use crate::protocol::ProtocolError;

/// What the front of an input buffer holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete drawing command spanning `consumed` bytes.
    Command { command: Command, consumed: usize },
    /// A complete request whose answer is `text` (text dialect only).
    Reply { text: String, consumed: usize },
    /// Input that carries nothing, such as a blank line.
    Ignored { consumed: usize },
    /// The next unit is not complete yet.  Nothing is consumed.
    Incomplete,
    /// The next `consumed` bytes form one malformed command.
    Malformed { consumed: usize },
}

/// Which protocol generation a listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    Binary,
    Text,
}

impl Dialect {
    /// Builds the decoder for a `width × height` canvas.
    ///
    /// # Errors
    ///
    /// The binary handshake advertises the canvas in single bytes, so a
    /// binary decoder cannot be built for a canvas wider or taller than 255.
    pub fn decoder(self, width: u16, height: u16) -> Result<Box<dyn Decoder>, ProtocolError> {
        Ok(match self {
            Dialect::Binary => Box::new(BinaryDecoder::new(width, height)?),
            Dialect::Text => Box::new(TextDecoder::new(width, height)),
        })
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Binary => f.write_str("binary"),
            Dialect::Text => f.write_str("text"),
        }
    }
}

/// Turns the front of a byte buffer into one unit of input.
///
/// Nothing is consumed unless the result says so.  The binary decoder keeps
/// no state between calls; the text decoder remembers when it is skipping the
/// rest of an overlong line.  Each connection owns its own decoder.
pub trait Decoder: Send {
    fn dialect(&self) -> Dialect;

    /// Bytes written to a client right after it connects.
    fn greeting(&self) -> &[u8];

    /// Inspects `input` and reports the next unit.
    fn decode(&mut self, input: &[u8]) -> Decoded;

    /// Whether an [`Decoded::Incomplete`] unit that stays incomplete for the
    /// read timeout must be discarded as malformed.
    fn partial_expires(&self) -> bool;
}
