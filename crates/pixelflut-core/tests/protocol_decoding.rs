//! Integration tests for the pixelflut-core decoders.
//!
//! These drive a byte stream through a decoder and the dispatcher the same
//! way a connection does: decode the front of the buffer, apply whatever came
//! out, advance by the consumed length, repeat until the decoder needs more.

use pixelflut_core::protocol::binary::{encode_command, wire_len};
use pixelflut_core::{
    Command, Decoded, Decoder, Dialect, Dispatcher, Framebuffer, Rgb, TelemetryCounters,
};

/// Feeds `stream` through `decoder` until it runs dry, returning the replies
/// produced and the number of bytes left over.
fn drain(
    decoder: &mut dyn Decoder,
    stream: &[u8],
    fb: &mut Framebuffer,
    counters: &mut TelemetryCounters,
) -> (Vec<String>, usize) {
    let mut replies = Vec::new();
    let mut pos = 0;
    loop {
        match decoder.decode(&stream[pos..]) {
            Decoded::Command { command, consumed } => {
                Dispatcher::apply(fb, &command, consumed, counters);
                pos += consumed;
            }
            Decoded::Reply { text, consumed } => {
                counters.record_command(consumed);
                replies.push(text);
                pos += consumed;
            }
            Decoded::Ignored { consumed } => pos += consumed,
            Decoded::Malformed { consumed } => {
                counters.record_malformed(consumed);
                pos += consumed;
            }
            Decoded::Incomplete => return (replies, stream.len() - pos),
        }
    }
}

#[test]
fn test_binary_stream_of_mixed_commands_paints_canvas() {
    // Arrange
    let mut decoder = Dialect::Binary.decoder(4, 4).expect("4x4 fits the handshake");
    let commands = [
        Command::Fill { color: Rgb::RED },
        Command::FillRect {
            x: 2,
            y: 2,
            width: 5,
            height: 5,
            color: Rgb::BLUE,
        },
        Command::SetPixel {
            x: 0,
            y: 0,
            color: Rgb::GREEN,
        },
    ];
    let stream: Vec<u8> = commands
        .iter()
        .flat_map(|c| encode_command(c).expect("encodable"))
        .collect();
    let mut fb = Framebuffer::with_size(4, 4);
    let mut counters = TelemetryCounters::default();

    // Act
    let (replies, leftover) = drain(decoder.as_mut(), &stream, &mut fb, &mut counters);

    // Assert
    assert!(replies.is_empty(), "binary dialect never replies");
    assert_eq!(leftover, 0);
    assert_eq!(fb.get(0, 0), Some(Rgb::GREEN));
    assert_eq!(fb.get(1, 1), Some(Rgb::RED));
    assert_eq!(fb.get(3, 3), Some(Rgb::BLUE));
    assert_eq!(counters.commands, 3);
    assert_eq!(
        counters.bytes as usize,
        commands.iter().map(wire_len).sum::<usize>()
    );
    assert_eq!(counters.errors, 0);
}

#[test]
fn test_binary_garbage_between_commands_is_skipped_byte_by_byte() {
    let mut decoder = Dialect::Binary.decoder(2, 2).unwrap();
    let mut stream = vec![0xee, 0x00, 0x7f];
    stream.extend(encode_command(&Command::Fill { color: Rgb::BLUE }).unwrap());
    let mut fb = Framebuffer::with_size(2, 2);
    let mut counters = TelemetryCounters::default();

    drain(decoder.as_mut(), &stream, &mut fb, &mut counters);

    assert_eq!(counters.errors, 3);
    assert_eq!(counters.commands, 1);
    assert_eq!(counters.bytes, 3 + 4);
    assert_eq!(fb.get(1, 1), Some(Rgb::BLUE));
}

#[test]
fn test_truncated_blit_leaves_canvas_untouched_until_complete() {
    // Arrange: a 2x2 blit with only one of its four colours present.
    let mut decoder = Dialect::Binary.decoder(2, 2).unwrap();
    let full = encode_command(&Command::BlitRect {
        x: 0,
        y: 0,
        width: 2,
        height: 2,
        colors: vec![Rgb::RED; 4],
    })
    .unwrap();
    let partial = &full[..8];
    let mut fb = Framebuffer::with_size(2, 2);
    let mut counters = TelemetryCounters::default();

    // Act
    let (_, leftover) = drain(decoder.as_mut(), partial, &mut fb, &mut counters);

    // Assert
    assert_eq!(leftover, 8, "nothing is consumed while incomplete");
    assert_eq!(counters, TelemetryCounters::default());
    assert_eq!(fb.get(0, 0), Some(Rgb::BLACK));

    let (_, leftover) = drain(decoder.as_mut(), &full, &mut fb, &mut counters);
    assert_eq!(leftover, 0);
    assert_eq!(fb.get(1, 1), Some(Rgb::RED));
}

#[test]
fn test_text_session_replies_and_draws() {
    // Arrange
    let mut decoder = Dialect::Text.decoder(300, 200).expect("text has no size cap");
    let stream = b"SIZE\nPX 3 4 FF0080\nPX 3 4\n\nhelp\nfoo\npx 299 199 00ff00\npx 1 2";
    let mut fb = Framebuffer::with_size(300, 200);
    let mut counters = TelemetryCounters::default();

    // Act
    let (replies, leftover) = drain(decoder.as_mut(), stream, &mut fb, &mut counters);

    // Assert: read-back is not supported even right after a write.
    assert_eq!(
        replies,
        vec![
            "SIZE 300 200\n",
            "PX 3 4 unknown\n",
            "there is no help yet\n",
            "unknown command. try help\n",
        ]
    );
    assert_eq!(fb.get(3, 4), Some(Rgb::new(0xff, 0x00, 0x80)));
    assert_eq!(fb.get(299, 199), Some(Rgb::GREEN));
    assert_eq!(leftover, b"px 1 2".len());
    assert_eq!(counters.commands, 6, "the blank line is not counted");
    assert_eq!(counters.errors, 0);
}

#[test]
fn test_both_dialects_produce_the_same_command() {
    let mut text = Dialect::Text.decoder(16, 16).unwrap();
    let mut binary = Dialect::Binary.decoder(16, 16).unwrap();

    let from_text = text.decode(b"px 3 4 ff0080\n");
    let from_binary = binary.decode(&[0x02, 3, 4, 0xff, 0x00, 0x80]);

    let (Decoded::Command { command: a, .. }, Decoded::Command { command: b, .. }) =
        (from_text, from_binary)
    else {
        panic!("both dialects must decode a command");
    };
    assert_eq!(a, b);
}

#[test]
fn test_greetings_differ_per_dialect() {
    assert_eq!(Dialect::Binary.decoder(64, 32).unwrap().greeting(), &[1, 64, 32]);
    assert!(Dialect::Text.decoder(64, 32).unwrap().greeting().is_empty());
    assert!(Dialect::Binary.decoder(256, 1).is_err());
}
