//! Legacy line-oriented text dialect.
//!
//! Every request is one `\n`-terminated ASCII line.  Bytes below 32 (stray
//! `\r`, tabs, other control codes) are dropped and the line is lowercased
//! before matching, so `PX`, `px` and `Px` are the same command.
//!
//! | Request           | Effect                                   |
//! |-------------------|------------------------------------------|
//! | `help`            | replies `there is no help yet`           |
//! | `size`            | replies `SIZE <width> <height>`          |
//! | `px x y`          | replies `PX x y unknown` (no read-back)  |
//! | `px x y rrggbb`   | sets one pixel                           |
//! | anything else     | replies `unknown command. try help`      |
//!
//! A line longer than [`MAX_LINE_LEN`] bytes is one malformed command.  The
//! whole line is discarded through its newline, however late that arrives.
//!
//! Coordinates are plain integers.  Ones that cannot address a pixel, such as
//! `-1` or `70000`, still make a valid command; the dispatcher skips the
//! pixel like any other off-canvas write.

use crate::domain::color::Rgb;
use crate::domain::command::Command;
use crate::protocol::decoder::{Decoded, Decoder, Dialect};

/// Longest accepted line, not counting the terminating newline.
pub const MAX_LINE_LEN: usize = 256;

pub const HELP_REPLY: &str = "there is no help yet";
pub const UNKNOWN_REPLY: &str = "unknown command. try help";
pub const BAD_COLOR_REPLY: &str = "colorcode not implemented. Use 6 digit hex color.";

/// The text dialect behind the [`Decoder`] capability.
#[derive(Debug, Clone)]
pub struct TextDecoder {
    width: u16,
    height: u16,
    /// Set while the tail of an overlong line is still arriving.
    discarding: bool,
}

impl TextDecoder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            discarding: false,
        }
    }

    fn handle_line(&self, line: &str, consumed: usize) -> Decoded {
        let reply = |text: String| Decoded::Reply {
            text: format!("{text}\n"),
            consumed,
        };

        let mut words = line.split_whitespace();
        match words.next() {
            Some("help") if words.next().is_none() => reply(HELP_REPLY.to_owned()),
            Some("size") if words.next().is_none() => {
                reply(format!("SIZE {} {}", self.width, self.height))
            }
            Some("px") => {
                let (Some(x_word), Some(y_word)) = (words.next(), words.next()) else {
                    return reply(UNKNOWN_REPLY.to_owned());
                };
                let (Some(x), Some(y)) = (parse_coord(x_word), parse_coord(y_word)) else {
                    return reply(UNKNOWN_REPLY.to_owned());
                };
                match (words.next(), words.next()) {
                    (None, _) => reply(format!("PX {x_word} {y_word} unknown")),
                    (Some(hex), None) => match Rgb::from_hex(hex) {
                        Some(color) => Decoded::Command {
                            command: Command::SetPixel { x, y, color },
                            consumed,
                        },
                        None => reply(BAD_COLOR_REPLY.to_owned()),
                    },
                    (Some(_), Some(_)) => reply(BAD_COLOR_REPLY.to_owned()),
                }
            }
            _ => reply(UNKNOWN_REPLY.to_owned()),
        }
    }
}

/// Parses a coordinate.  Integers outside `u16` map to `u16::MAX`, which no
/// canvas contains.
fn parse_coord(word: &str) -> Option<u16> {
    let digits = word.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(word);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(word.parse::<u16>().unwrap_or(u16::MAX))
}

/// Drops control bytes and lowercases what remains.
fn clean_line(raw: &[u8]) -> String {
    let printable: Vec<u8> = raw.iter().copied().filter(|&b| b >= 32).collect();
    String::from_utf8_lossy(&printable).to_lowercase()
}

impl Decoder for TextDecoder {
    fn dialect(&self) -> Dialect {
        Dialect::Text
    }

    fn greeting(&self) -> &[u8] {
        &[]
    }

    fn decode(&mut self, input: &[u8]) -> Decoded {
        let newline = input.iter().position(|&b| b == b'\n');

        if self.discarding {
            return match newline {
                Some(newline) => {
                    self.discarding = false;
                    Decoded::Ignored {
                        consumed: newline + 1,
                    }
                }
                None if input.is_empty() => Decoded::Incomplete,
                None => Decoded::Ignored {
                    consumed: input.len(),
                },
            };
        }

        let newline = match newline {
            Some(newline) if newline <= MAX_LINE_LEN => newline,
            Some(newline) => {
                return Decoded::Malformed {
                    consumed: newline + 1,
                }
            }
            None if input.len() > MAX_LINE_LEN => {
                self.discarding = true;
                return Decoded::Malformed {
                    consumed: input.len(),
                };
            }
            None => return Decoded::Incomplete,
        };

        let consumed = newline + 1;
        let line = clean_line(&input[..newline]);
        if line.trim().is_empty() {
            return Decoded::Ignored { consumed };
        }
        self.handle_line(&line, consumed)
    }

    fn partial_expires(&self) -> bool {
        false
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
